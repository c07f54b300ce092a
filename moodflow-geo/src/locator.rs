//! Concurrent multi-provider country lookup.
//!
//! Queries every enabled provider whose circuit allows it, in parallel, and
//! returns the answer from the highest-priority provider that succeeded.

use std::sync::Mutex;
use std::time::Instant;

use crate::cache::{CacheKey, CountryCache};
use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::config::GeoConfig;
use crate::error::GeoError;
use crate::http::build_client;
use crate::provider::GeoProviderTrait;
use crate::providers::{IpApiCoProvider, IpApiComProvider, IpWhoIsProvider};
use crate::types::{CountryCode, GeoProvider};

/// Resolves the host's country from its public IP.
///
/// Owns its HTTP client, answer cache and circuit breaker, so two locators
/// never share failure state.
pub struct GeoLocator {
    config: GeoConfig,
    client: reqwest::Client,
    cache: CountryCache,
    breaker: Mutex<CircuitBreaker>,
}

impl GeoLocator {
    /// Build a locator after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Config`] for an invalid configuration and
    /// [`GeoError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: GeoConfig) -> Result<Self, GeoError> {
        config.validate()?;
        let client = build_client(&config)?;
        let cache = CountryCache::new(config.cache_ttl_seconds);
        let breaker = Mutex::new(CircuitBreaker::new(config.circuit_breaker.clone()));
        Ok(Self {
            config,
            client,
            cache,
            breaker,
        })
    }

    pub fn config(&self) -> &GeoConfig {
        &self.config
    }

    /// Look up the host's country.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::AllProvidersFailed`] when no provider produced a
    /// country, including when every circuit is open.
    pub async fn lookup_country(&self) -> Result<CountryCode, GeoError> {
        let key = CacheKey::new(&self.config.providers);
        if let Some(country) = self.cache.get(&key).await {
            tracing::debug!("country served from cache");
            return Ok(country);
        }

        let candidates = self.attemptable_providers();
        if candidates.is_empty() {
            return Err(GeoError::AllProvidersFailed(
                "every provider circuit is open".into(),
            ));
        }

        let lookups: Vec<_> = candidates
            .iter()
            .map(|provider| {
                let provider = *provider;
                async move { (provider, self.query_provider(provider).await) }
            })
            .collect();

        let outcomes = futures::future::join_all(lookups).await;

        let mut winner: Option<CountryCode> = None;
        let mut errors: Vec<String> = Vec::new();
        {
            let mut breaker = self.lock_breaker();
            let now = Instant::now();
            // Outcomes come back in priority order, so the first Ok wins.
            for (provider, outcome) in outcomes {
                breaker.record(provider, outcome.is_ok(), now);
                match outcome {
                    Ok(country) => {
                        tracing::debug!(%provider, "provider resolved country");
                        if winner.is_none() {
                            winner = Some(country);
                        }
                    }
                    Err(err) => {
                        tracing::warn!(provider = %provider, error = %err, "geolocation provider failed");
                        errors.push(format!("{provider}: {err}"));
                    }
                }
            }
        }

        match winner {
            Some(country) => {
                self.cache.insert(key, country.clone()).await;
                Ok(country)
            }
            None => Err(GeoError::AllProvidersFailed(errors.join("; "))),
        }
    }

    /// Circuit state of every configured provider, in priority order.
    pub fn provider_health(&self) -> Vec<(GeoProvider, CircuitState)> {
        let breaker = self.lock_breaker();
        self.config
            .providers
            .iter()
            .map(|p| (*p, breaker.state(*p)))
            .collect()
    }

    fn attemptable_providers(&self) -> Vec<GeoProvider> {
        let mut breaker = self.lock_breaker();
        let now = Instant::now();
        self.config
            .providers
            .iter()
            .copied()
            .filter(|provider| {
                let allowed = breaker.admit(*provider, now);
                if !allowed {
                    tracing::debug!(%provider, "skipping benched provider");
                }
                allowed
            })
            .collect()
    }

    fn lock_breaker(&self) -> std::sync::MutexGuard<'_, CircuitBreaker> {
        // A poisoned breaker only holds counters; keep using them.
        self.breaker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    async fn query_provider(&self, provider: GeoProvider) -> Result<CountryCode, GeoError> {
        let endpoint = self.config.endpoint_for(provider);
        match provider {
            GeoProvider::IpApiCo => IpApiCoProvider::new(endpoint).lookup(&self.client).await,
            GeoProvider::IpApiCom => IpApiComProvider::new(endpoint).lookup(&self.client).await,
            GeoProvider::IpWhoIs => IpWhoIsProvider::new(endpoint).lookup(&self.client).await,
        }
    }
}
