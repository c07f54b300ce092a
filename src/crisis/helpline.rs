//! Static helpline directory keyed by primary language subtag.

use serde::{Deserialize, Serialize};

use crate::language::codes::primary_subtag;

/// A crisis helpline a user can be pointed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelplineInfo {
    /// Region code (`US`, `IN`, ... or `INTL`).
    pub code: String,
    pub name: String,
    /// Empty when the entry is a directory rather than a phone line.
    pub phone: String,
    pub url: Option<String>,
    pub language: Option<String>,
}

struct Entry {
    language: &'static str,
    code: &'static str,
    name: &'static str,
    phone: &'static str,
    url: &'static str,
}

const BUILTIN: &[Entry] = &[
    Entry {
        language: "en",
        code: "US",
        name: "988 Suicide & Crisis Lifeline (USA)",
        phone: "988",
        url: "https://988lifeline.org",
    },
    Entry {
        language: "hi",
        code: "IN",
        name: "Kiran Mental Health Helpline (India)",
        phone: "1800-599-0019",
        url: "https://www.mohfw.gov.in/",
    },
    Entry {
        language: "es",
        code: "ES",
        name: "Línea 024 Contigo (España)",
        phone: "024",
        url: "https://www.sanidad.gob.es",
    },
    Entry {
        language: "zh",
        code: "CN",
        name: "Beijing Suicide Research & Prevention Center",
        phone: "800-810-1117",
        url: "http://www.crisis.org.cn/",
    },
    Entry {
        language: "ar",
        code: "AE",
        name: "UAE Mental Health Support Line",
        phone: "800-4673",
        url: "https://www.mohap.gov.ae",
    },
];

impl Entry {
    fn to_info(&self) -> HelplineInfo {
        HelplineInfo {
            code: self.code.to_owned(),
            name: self.name.to_owned(),
            phone: self.phone.to_owned(),
            url: Some(self.url.to_owned()),
            language: Some(self.language.to_owned()),
        }
    }
}

/// Helpline lookup table with an international fallback.
#[derive(Debug, Clone)]
pub struct HelplineDirectory {
    entries: Vec<(String, HelplineInfo)>,
    fallback: HelplineInfo,
}

impl Default for HelplineDirectory {
    fn default() -> Self {
        Self::builtin()
    }
}

impl HelplineDirectory {
    /// The shipped directory: en, hi, es, zh, ar plus the `INTL` fallback.
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN
                .iter()
                .map(|e| (e.language.to_owned(), e.to_info()))
                .collect(),
            fallback: international(),
        }
    }

    /// A custom directory. Language keys are matched on primary subtag.
    pub fn with_entries(
        entries: impl IntoIterator<Item = (String, HelplineInfo)>,
        fallback: HelplineInfo,
    ) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(lang, info)| (lang.to_ascii_lowercase(), info))
                .collect(),
            fallback,
        }
    }

    /// Helpline for `language` (`es-MX` → `es`), else the fallback entry.
    #[must_use]
    pub fn lookup(&self, language: Option<&str>) -> HelplineInfo {
        let Some(primary) = language.map(primary_subtag).filter(|p| !p.is_empty()) else {
            return self.fallback.clone();
        };
        self.entries
            .iter()
            .find(|(lang, _)| *lang == primary)
            .map_or_else(|| self.fallback.clone(), |(_, info)| info.clone())
    }
}

fn international() -> HelplineInfo {
    HelplineInfo {
        code: "INTL".to_owned(),
        name: "Find a helpline – International directory".to_owned(),
        phone: String::new(),
        url: Some("https://findahelpline.com/".to_owned()),
        language: Some("en".to_owned()),
    }
}
