//! Language code tables: supported set, display names, script direction and
//! the country → language map used by the geolocation rung.

/// Primary subtags written right-to-left.
const RTL_CODES: &[&str] = &["ar", "he", "fa", "ur"];

/// Native display names.
const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("en", "English"),
    ("hi", "हिन्दी"),
    ("es", "Español"),
    ("fr", "Français"),
    ("zh", "中文"),
    ("ja", "日本語"),
    ("ko", "한국어"),
    ("ar", "العربية"),
    ("de", "Deutsch"),
    ("it", "Italiano"),
    ("pt", "Português"),
];

/// ISO country → language for countries whose language differs from the
/// default.
const COUNTRY_LANGUAGES: &[(&str, &str)] = &[
    ("IN", "hi"),
    ("ES", "es"),
    ("MX", "es"),
    ("AR", "es"),
    ("CN", "zh"),
    ("TW", "zh"),
    ("HK", "zh"),
    ("AE", "ar"),
    ("SA", "ar"),
    ("QA", "ar"),
];

/// Lower-cased primary subtag: `es-MX` → `es`, `zh_Hant` → `zh`.
#[must_use]
pub fn primary_subtag(code: &str) -> String {
    code.trim()
        .split(['-', '_', '.'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

#[must_use]
pub fn is_rtl(code: &str) -> bool {
    RTL_CODES.contains(&primary_subtag(code).as_str())
}

/// Native name for `code`, or the upper-cased code when unknown.
#[must_use]
pub fn display_name(code: &str) -> String {
    let primary = primary_subtag(code);
    LANGUAGE_NAMES
        .iter()
        .find(|(c, _)| *c == primary)
        .map_or_else(|| primary.to_ascii_uppercase(), |(_, name)| (*name).to_owned())
}

/// Language implied by an ISO 3166 alpha-2 country code.
#[must_use]
pub fn language_for_country(country: &str) -> Option<&'static str> {
    let upper = country.trim().to_ascii_uppercase();
    COUNTRY_LANGUAGES
        .iter()
        .find(|(c, _)| *c == upper)
        .map(|(_, lang)| *lang)
}

/// The fixed set of languages the product is localised into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedLanguages {
    codes: Vec<String>,
    default: String,
}

impl SupportedLanguages {
    /// Codes are lower-cased; `default` is expected to be among them.
    pub fn new(codes: &[String], default: &str) -> Self {
        Self {
            codes: codes.iter().map(|c| c.trim().to_ascii_lowercase()).collect(),
            default: default.trim().to_ascii_lowercase(),
        }
    }

    pub fn default_code(&self) -> &str {
        &self.default
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Match `raw` case-insensitively, then by primary subtag.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let lower = raw.trim().to_ascii_lowercase().replace('_', "-");
        if lower.is_empty() {
            return None;
        }
        if let Some(code) = self.codes.iter().find(|c| **c == lower) {
            return Some(code.clone());
        }
        let primary = primary_subtag(&lower);
        self.codes.iter().find(|c| **c == primary).cloned()
    }

    /// [`normalize`](Self::normalize), falling back to the default.
    #[must_use]
    pub fn normalize_or_default(&self, raw: &str) -> String {
        self.normalize(raw).unwrap_or_else(|| self.default.clone())
    }

    pub fn is_default(&self, code: &str) -> bool {
        code.eq_ignore_ascii_case(&self.default)
    }
}
