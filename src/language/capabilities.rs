//! Injected capabilities for the language resolution chain.
//!
//! The resolver never touches the environment, the network or storage
//! directly; each rung goes through one of these traits so it can be
//! replaced in tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use moodflow_geo::GeoLocator;

use crate::error::{MoodError, Result};
use crate::storage::{MoodRepository, SettingsPatch};

/// Reports the device/OS locale.
pub trait DeviceLocaleProvider: Send + Sync {
    fn locale(&self) -> Option<String>;
}

/// Device locale from `LC_ALL`, `LC_MESSAGES` or `LANG`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvLocaleProvider;

impl DeviceLocaleProvider for EnvLocaleProvider {
    fn locale(&self) -> Option<String> {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find_map(|raw| parse_posix_locale(&raw))
    }
}

/// A fixed device locale (or none).
#[derive(Debug, Clone, Default)]
pub struct FixedLocale(pub Option<String>);

impl DeviceLocaleProvider for FixedLocale {
    fn locale(&self) -> Option<String> {
        self.0.clone()
    }
}

/// `es_MX.UTF-8` → `es-MX`. `C` and `POSIX` mean "no preference".
#[must_use]
pub fn parse_posix_locale(raw: &str) -> Option<String> {
    let base = raw
        .trim()
        .split(['.', '@'])
        .next()
        .unwrap_or_default();
    if base.is_empty() || base.eq_ignore_ascii_case("c") || base.eq_ignore_ascii_case("posix") {
        return None;
    }
    Some(base.replace('_', "-"))
}

/// Locally persisted preference, the write-through cache in front of the
/// backend.
pub trait PreferenceStore: Send + Sync {
    fn load(&self, user_id: &str) -> Option<String>;
    fn save(&self, user_id: &str, code: &str);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self, user_id: &str) -> Option<String> {
        self.values
            .read()
            .ok()
            .and_then(|values| values.get(user_id).cloned())
    }

    fn save(&self, user_id: &str, code: &str) {
        match self.values.write() {
            Ok(mut values) => {
                values.insert(user_id.to_owned(), code.to_owned());
            }
            Err(_) => tracing::warn!("local preference store poisoned; preference not cached"),
        }
    }
}

/// Backend-stored per-user language preference.
#[async_trait]
pub trait BackendPreferences: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<Option<String>>;
    async fn store(&self, user_id: &str, code: &str) -> Result<()>;
}

/// Backend preferences kept in the user's settings record.
pub struct RepositoryPreferenceBackend {
    repo: Arc<dyn MoodRepository>,
}

impl RepositoryPreferenceBackend {
    pub fn new(repo: Arc<dyn MoodRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl BackendPreferences for RepositoryPreferenceBackend {
    async fn fetch(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self
            .repo
            .get_user_settings(user_id)
            .await?
            .and_then(|s| s.preferred_language))
    }

    async fn store(&self, user_id: &str, code: &str) -> Result<()> {
        self.repo
            .update_user_settings(user_id, SettingsPatch::language(code))
            .await
            .map(|_| ())
    }
}

/// One-shot "which country is this host in" lookup.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// ISO 3166-1 alpha-2 code.
    async fn country_code(&self) -> Result<String>;
}

/// Geolocation through the multi-provider [`GeoLocator`].
pub struct HttpGeoLookup {
    locator: GeoLocator,
}

impl HttpGeoLookup {
    pub fn new(locator: GeoLocator) -> Self {
        Self { locator }
    }
}

#[async_trait]
impl GeoLookup for HttpGeoLookup {
    async fn country_code(&self) -> Result<String> {
        self.locator
            .lookup_country()
            .await
            .map(|country| country.as_str().to_owned())
            .map_err(|e| MoodError::Language(format!("geolocation failed: {e}")))
    }
}

/// A geolocation answer fixed up front.
#[derive(Debug, Clone)]
pub struct StaticGeoLookup(pub Option<String>);

#[async_trait]
impl GeoLookup for StaticGeoLookup {
    async fn country_code(&self) -> Result<String> {
        self.0
            .clone()
            .ok_or_else(|| MoodError::Language("no country available".into()))
    }
}
