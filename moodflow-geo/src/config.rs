//! Geolocation configuration with sensible defaults.
//!
//! [`GeoConfig`] controls which providers are queried, timeouts, caching,
//! and circuit breaker behaviour.

use std::collections::HashMap;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::error::GeoError;
use crate::types::GeoProvider;

/// Configuration for a geolocation lookup.
#[derive(Debug, Clone)]
pub struct GeoConfig {
    /// Providers to query, highest priority first. Queried concurrently;
    /// the highest-priority success wins.
    pub providers: Vec<GeoProvider>,
    /// Per-provider endpoint overrides (tests, self-hosted mirrors).
    pub endpoint_overrides: HashMap<GeoProvider, String>,
    /// Per-provider HTTP request timeout in seconds.
    pub timeout_seconds: u64,
    /// How long a resolved country is cached. 0 disables caching.
    pub cache_ttl_seconds: u64,
    /// Custom User-Agent string. Defaults to `moodflow-geo/<version>`.
    pub user_agent: Option<String>,
    /// Failure tracking per provider.
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            providers: GeoProvider::all().to_vec(),
            endpoint_overrides: HashMap::new(),
            timeout_seconds: 3,
            cache_ttl_seconds: 3600,
            user_agent: None,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl GeoConfig {
    /// Endpoint to use for `provider`, honouring overrides.
    pub fn endpoint_for(&self, provider: GeoProvider) -> &str {
        self.endpoint_overrides
            .get(&provider)
            .map_or(provider.default_endpoint(), String::as_str)
    }

    /// Validates this configuration.
    ///
    /// Checks:
    /// - `providers` must not be empty
    /// - `timeout_seconds` must be greater than 0
    /// - every endpoint override must be an absolute `http`/`https` URL
    pub fn validate(&self) -> Result<(), GeoError> {
        if self.providers.is_empty() {
            return Err(GeoError::Config(
                "at least one provider must be enabled".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(GeoError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        for (provider, endpoint) in &self.endpoint_overrides {
            let parsed = url::Url::parse(endpoint).map_err(|e| {
                GeoError::Config(format!("invalid endpoint for {provider}: {e}"))
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(GeoError::Config(format!(
                    "endpoint for {provider} must use http or https"
                )));
            }
        }
        Ok(())
    }
}
