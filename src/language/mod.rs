//! Language preference: supported codes, platform capabilities and the
//! resolution chain that picks the active UI language.

pub mod capabilities;
pub mod codes;
pub mod resolver;

pub use capabilities::{
    BackendPreferences, DeviceLocaleProvider, EnvLocaleProvider, FixedLocale, GeoLookup,
    HttpGeoLookup, MemoryPreferenceStore, PreferenceStore, RepositoryPreferenceBackend,
    StaticGeoLookup,
};
pub use codes::{SupportedLanguages, display_name, is_rtl, language_for_country};
pub use resolver::{LanguagePreferenceResolver, LanguageSource, ResolvedLanguage};
