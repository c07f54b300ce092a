//! # moodflow-geo
//!
//! Best-effort country lookup for MoodFlow's language resolution.
//!
//! The host's public IP is resolved to an ISO country code by asking free
//! "where am I" JSON endpoints. No API keys, no listeners.
//!
//! ## Design
//!
//! - Queries ipapi.co, ip-api.com and ipwho.is concurrently
//! - The highest-priority provider that answers wins
//! - Per-provider circuit breaker skips endpoints that keep failing
//! - Answers are cached with a configurable TTL
//!
//! ## Privacy
//!
//! - The IP address is never logged or returned
//! - Country codes are logged only at debug level

pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod http;
pub mod locator;
pub mod provider;
pub mod providers;
pub mod types;

pub use circuit_breaker::{CircuitBreakerConfig, CircuitState};
pub use config::GeoConfig;
pub use error::{GeoError, Result};
pub use locator::GeoLocator;
pub use provider::GeoProviderTrait;
pub use types::{CountryCode, GeoProvider};

/// One-shot lookup with a fresh locator built from `config`.
///
/// Long-lived callers should keep a [`GeoLocator`] so the cache and circuit
/// breaker carry across lookups.
///
/// # Errors
///
/// Returns [`GeoError::Config`] for invalid configuration and
/// [`GeoError::AllProvidersFailed`] if no provider answers.
pub async fn lookup_country(config: GeoConfig) -> Result<CountryCode> {
    GeoLocator::new(config)?.lookup_country().await
}
