//! Language preference resolution chain.
//!
//! Rungs, first actionable value wins:
//!
//! 1. explicit user choice (short-circuits, even if it normalises to the default)
//! 2. backend-stored preference
//! 3. locally persisted preference
//! 4. geolocation, only when nothing is persisted locally and the candidate
//!    so far is absent or the default
//! 5. device locale
//! 6. hard default
//!
//! Network rungs are time-bounded and never fail the resolution. The result
//! is written through to both the local store and the backend.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::capabilities::{BackendPreferences, DeviceLocaleProvider, GeoLookup, PreferenceStore};
use super::codes::{SupportedLanguages, display_name, is_rtl, language_for_country};
use crate::config::LanguageConfig;

/// Which rung produced a resolved language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageSource {
    Explicit,
    Backend,
    Local,
    Geolocation,
    Device,
    Default,
}

/// A resolved language plus the layout metadata that travels with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLanguage {
    pub code: String,
    pub rtl: bool,
    pub name: String,
    pub source: LanguageSource,
}

impl ResolvedLanguage {
    fn new(code: String, source: LanguageSource) -> Self {
        Self {
            rtl: is_rtl(&code),
            name: display_name(&code),
            code,
            source,
        }
    }
}

pub struct LanguagePreferenceResolver {
    supported: SupportedLanguages,
    geo_enabled: bool,
    geo_timeout: Duration,
    backend_timeout: Duration,
    local: Arc<dyn PreferenceStore>,
    device: Arc<dyn DeviceLocaleProvider>,
    backend: Option<Arc<dyn BackendPreferences>>,
    geo: Option<Arc<dyn GeoLookup>>,
}

impl LanguagePreferenceResolver {
    pub fn new(
        config: &LanguageConfig,
        local: Arc<dyn PreferenceStore>,
        device: Arc<dyn DeviceLocaleProvider>,
    ) -> Self {
        Self {
            supported: SupportedLanguages::new(&config.supported, &config.default_language),
            geo_enabled: config.geo_enabled,
            geo_timeout: Duration::from_millis(config.geo_timeout_ms),
            backend_timeout: Duration::from_millis(config.backend_timeout_ms),
            local,
            device,
            backend: None,
            geo: None,
        }
    }

    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn BackendPreferences>) -> Self {
        self.backend = Some(backend);
        self
    }

    #[must_use]
    pub fn with_geo(mut self, geo: Arc<dyn GeoLookup>) -> Self {
        self.geo = Some(geo);
        self
    }

    pub fn supported(&self) -> &SupportedLanguages {
        &self.supported
    }

    /// Resolve the active language for `user_id` and persist it.
    pub async fn resolve(&self, user_id: &str, explicit: Option<&str>) -> ResolvedLanguage {
        let resolved = self.resolve_chain(user_id, explicit).await;
        tracing::debug!(
            code = %resolved.code,
            source = ?resolved.source,
            "language resolved"
        );
        self.persist(user_id, &resolved).await;
        resolved
    }

    async fn resolve_chain(&self, user_id: &str, explicit: Option<&str>) -> ResolvedLanguage {
        if let Some(choice) = explicit.filter(|c| !c.trim().is_empty()) {
            let code = self.supported.normalize_or_default(choice);
            return ResolvedLanguage::new(code, LanguageSource::Explicit);
        }

        let local = self
            .local
            .load(user_id)
            .and_then(|raw| self.supported.normalize(&raw));

        let mut candidate = self
            .fetch_backend(user_id)
            .await
            .map(|code| (code, LanguageSource::Backend));
        if candidate.is_none() {
            candidate = local.clone().map(|code| (code, LanguageSource::Local));
        }

        let candidate_is_default = candidate
            .as_ref()
            .is_none_or(|(code, _)| self.supported.is_default(code));
        if local.is_none() && candidate_is_default {
            if let Some(code) = self.lookup_geo().await {
                return ResolvedLanguage::new(code, LanguageSource::Geolocation);
            }
        }

        if let Some((code, source)) = candidate {
            return ResolvedLanguage::new(code, source);
        }

        if let Some(code) = self
            .device
            .locale()
            .and_then(|raw| self.supported.normalize(&raw))
        {
            return ResolvedLanguage::new(code, LanguageSource::Device);
        }

        ResolvedLanguage::new(
            self.supported.default_code().to_owned(),
            LanguageSource::Default,
        )
    }

    async fn fetch_backend(&self, user_id: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match tokio::time::timeout(self.backend_timeout, backend.fetch(user_id)).await {
            Ok(Ok(Some(raw))) => {
                let normalized = self.supported.normalize(&raw);
                if normalized.is_none() {
                    tracing::debug!(raw = %raw, "backend preference not supported; ignoring");
                }
                normalized
            }
            Ok(Ok(None)) => None,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "backend preference fetch failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.backend_timeout.as_millis() as u64,
                    "backend preference fetch timed out"
                );
                None
            }
        }
    }

    async fn lookup_geo(&self) -> Option<String> {
        if !self.geo_enabled {
            return None;
        }
        let geo = self.geo.as_ref()?;
        let country = match tokio::time::timeout(self.geo_timeout, geo.country_code()).await {
            Ok(Ok(country)) => country,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "geolocation lookup failed");
                return None;
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.geo_timeout.as_millis() as u64,
                    "geolocation lookup timed out"
                );
                return None;
            }
        };
        let mapped = language_for_country(&country).and_then(|lang| self.supported.normalize(lang));
        tracing::debug!(country = %country, language = ?mapped, "geolocation answered");
        mapped
    }

    async fn persist(&self, user_id: &str, resolved: &ResolvedLanguage) {
        self.local.save(user_id, &resolved.code);

        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        match tokio::time::timeout(self.backend_timeout, backend.store(user_id, &resolved.code))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "backend preference write failed"),
            Err(_) => tracing::warn!("backend preference write timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::error::{MoodError, Result};
    use crate::language::capabilities::{FixedLocale, MemoryPreferenceStore, StaticGeoLookup};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingBackend {
        stored: Mutex<Option<String>>,
        writes: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingBackend {
        fn with(code: &str) -> Self {
            Self {
                stored: Mutex::new(Some(code.to_owned())),
                ..Default::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl BackendPreferences for RecordingBackend {
        async fn fetch(&self, _user_id: &str) -> Result<Option<String>> {
            if self.fail {
                return Err(MoodError::Storage("backend down".into()));
            }
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn store(&self, _user_id: &str, code: &str) -> Result<()> {
            if self.fail {
                return Err(MoodError::Storage("backend down".into()));
            }
            self.writes.lock().unwrap().push(code.to_owned());
            *self.stored.lock().unwrap() = Some(code.to_owned());
            Ok(())
        }
    }

    struct CountingGeo {
        country: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GeoLookup for CountingGeo {
        async fn country_code(&self) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.country
                .map(str::to_owned)
                .ok_or_else(|| MoodError::Language("offline".into()))
        }
    }

    struct SlowGeo;

    #[async_trait]
    impl GeoLookup for SlowGeo {
        async fn country_code(&self) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("IN".into())
        }
    }

    fn resolver(
        local: Arc<MemoryPreferenceStore>,
        device: Option<&str>,
    ) -> LanguagePreferenceResolver {
        LanguagePreferenceResolver::new(
            &LanguageConfig::default(),
            local,
            Arc::new(FixedLocale(device.map(str::to_owned))),
        )
    }

    #[tokio::test]
    async fn explicit_choice_wins_and_is_persisted() {
        let local = Arc::new(MemoryPreferenceStore::new());
        let backend = Arc::new(RecordingBackend::with("hi"));
        let geo = Arc::new(CountingGeo {
            country: Some("CN"),
            calls: AtomicUsize::new(0),
        });
        let r = resolver(local.clone(), Some("ar"))
            .with_backend(backend.clone())
            .with_geo(geo.clone());

        let resolved = r.resolve("u1", Some("es")).await;
        assert_eq!(resolved.code, "es");
        assert_eq!(resolved.source, LanguageSource::Explicit);
        assert_eq!(local.load("u1").as_deref(), Some("es"));
        assert_eq!(*backend.writes.lock().unwrap(), vec!["es".to_owned()]);
        assert_eq!(geo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unsupported_explicit_choice_normalises_to_default() {
        let local = Arc::new(MemoryPreferenceStore::new());
        let resolved = resolver(local, Some("hi")).resolve("u1", Some("fr")).await;
        assert_eq!(resolved.code, "en");
        assert_eq!(resolved.source, LanguageSource::Explicit);
    }

    #[tokio::test]
    async fn backend_preference_beats_device() {
        let local = Arc::new(MemoryPreferenceStore::new());
        let resolved = resolver(local, Some("es-ES"))
            .with_backend(Arc::new(RecordingBackend::with("ZH")))
            .resolve("u1", None)
            .await;
        assert_eq!(resolved.code, "zh");
        assert_eq!(resolved.source, LanguageSource::Backend);
        assert_eq!(resolved.name, "中文");
    }

    #[tokio::test]
    async fn geo_consulted_when_backend_holds_default_and_nothing_local() {
        let local = Arc::new(MemoryPreferenceStore::new());
        let resolved = resolver(local.clone(), None)
            .with_backend(Arc::new(RecordingBackend::with("en")))
            .with_geo(Arc::new(StaticGeoLookup(Some("AE".into()))))
            .resolve("u1", None)
            .await;
        assert_eq!(resolved.code, "ar");
        assert!(resolved.rtl);
        assert_eq!(resolved.source, LanguageSource::Geolocation);
        assert_eq!(local.load("u1").as_deref(), Some("ar"));
    }

    #[tokio::test]
    async fn geo_skipped_when_local_preference_exists() {
        let local = Arc::new(MemoryPreferenceStore::new());
        local.save("u1", "hi");
        let geo = Arc::new(CountingGeo {
            country: Some("CN"),
            calls: AtomicUsize::new(0),
        });
        let resolved = resolver(local, None)
            .with_geo(geo.clone())
            .resolve("u1", None)
            .await;
        assert_eq!(resolved.code, "hi");
        assert_eq!(resolved.source, LanguageSource::Local);
        assert_eq!(geo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn geo_skipped_when_backend_has_non_default() {
        let local = Arc::new(MemoryPreferenceStore::new());
        let geo = Arc::new(CountingGeo {
            country: Some("CN"),
            calls: AtomicUsize::new(0),
        });
        let resolved = resolver(local, None)
            .with_backend(Arc::new(RecordingBackend::with("es")))
            .with_geo(geo.clone())
            .resolve("u1", None)
            .await;
        assert_eq!(resolved.code, "es");
        assert_eq!(geo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn geo_failure_and_unmapped_country_fall_through_to_device() {
        let local = Arc::new(MemoryPreferenceStore::new());
        let resolved = resolver(local.clone(), Some("hi_IN.UTF-8"))
            .with_geo(Arc::new(StaticGeoLookup(None)))
            .resolve("u1", None)
            .await;
        assert_eq!(resolved.code, "hi");
        assert_eq!(resolved.source, LanguageSource::Device);

        let local = Arc::new(MemoryPreferenceStore::new());
        let resolved = resolver(local, Some("es-MX"))
            .with_geo(Arc::new(StaticGeoLookup(Some("US".into()))))
            .resolve("u2", None)
            .await;
        assert_eq!(resolved.code, "es");
        assert_eq!(resolved.source, LanguageSource::Device);
    }

    #[tokio::test]
    async fn backend_failure_is_swallowed() {
        let local = Arc::new(MemoryPreferenceStore::new());
        let resolved = resolver(local, None)
            .with_backend(Arc::new(RecordingBackend::failing()))
            .resolve("u1", None)
            .await;
        assert_eq!(resolved.code, "en");
        assert_eq!(resolved.source, LanguageSource::Default);
    }

    #[tokio::test]
    async fn slow_geo_times_out_to_default() {
        let config = LanguageConfig {
            geo_timeout_ms: 50,
            ..Default::default()
        };
        let resolved = LanguagePreferenceResolver::new(
            &config,
            Arc::new(MemoryPreferenceStore::new()),
            Arc::new(FixedLocale(None)),
        )
        .with_geo(Arc::new(SlowGeo))
        .resolve("u1", None)
        .await;
        assert_eq!(resolved.code, "en");
        assert_eq!(resolved.source, LanguageSource::Default);
    }

    #[tokio::test]
    async fn geo_disabled_by_config() {
        let config = LanguageConfig {
            geo_enabled: false,
            ..Default::default()
        };
        let geo = Arc::new(CountingGeo {
            country: Some("IN"),
            calls: AtomicUsize::new(0),
        });
        let resolved = LanguagePreferenceResolver::new(
            &config,
            Arc::new(MemoryPreferenceStore::new()),
            Arc::new(FixedLocale(None)),
        )
        .with_geo(geo.clone())
        .resolve("u1", None)
        .await;
        assert_eq!(resolved.source, LanguageSource::Default);
        assert_eq!(geo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_resolution_served_from_persisted_value() {
        let local = Arc::new(MemoryPreferenceStore::new());
        let geo = Arc::new(CountingGeo {
            country: Some("IN"),
            calls: AtomicUsize::new(0),
        });
        let r = resolver(local, None).with_geo(geo.clone());

        assert_eq!(r.resolve("u1", None).await.code, "hi");
        let again = r.resolve("u1", None).await;
        assert_eq!(again.code, "hi");
        assert_eq!(again.source, LanguageSource::Local);
        assert_eq!(geo.calls.load(Ordering::SeqCst), 1);
    }
}
