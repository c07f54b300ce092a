//! Trait definition for pluggable geolocation providers.
//!
//! Each provider (ipapi.co, ip-api.com, ipwho.is) implements
//! [`GeoProviderTrait`] so the locator can fan out to them uniformly.

use crate::error::GeoError;
use crate::types::{CountryCode, GeoProvider};

/// A pluggable IP geolocation backend.
///
/// Implementors request the caller's own location from one provider and
/// extract the country code. Each provider handles its own response shape
/// and in-band error signalling (several providers answer `200 OK` with an
/// error flag in the body).
///
/// All implementations must be `Send + Sync` for concurrent lookups.
pub trait GeoProviderTrait: Send + Sync {
    /// Look up the country of the calling host.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the request fails, the provider reports an
    /// error, or the body has no usable country code.
    fn lookup(
        &self,
        client: &reqwest::Client,
    ) -> impl std::future::Future<Output = Result<CountryCode, GeoError>> + Send;

    /// Which [`GeoProvider`] variant this implementation represents.
    fn provider_type(&self) -> GeoProvider;
}
