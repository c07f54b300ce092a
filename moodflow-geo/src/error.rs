//! Error types for the moodflow-geo crate.
//!
//! Messages are stable and never include the caller's IP address.

/// Errors that can occur during a geolocation lookup.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    /// Every enabled provider failed (or was circuit-open).
    #[error("all geolocation providers failed: {0}")]
    AllProvidersFailed(String),

    /// A lookup did not complete within the configured bound.
    #[error("geolocation timed out: {0}")]
    Timeout(String),

    /// An HTTP request to a provider failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider answered but the body was unusable.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid geolocation configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for moodflow-geo results.
pub type Result<T> = std::result::Result<T, GeoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_all_providers_failed() {
        let err = GeoError::AllProvidersFailed("ipapi.co: HTTP error: 429".into());
        assert_eq!(
            err.to_string(),
            "all geolocation providers failed: ipapi.co: HTTP error: 429"
        );
    }

    #[test]
    fn display_timeout() {
        let err = GeoError::Timeout("exceeded 3s limit".into());
        assert_eq!(err.to_string(), "geolocation timed out: exceeded 3s limit");
    }

    #[test]
    fn display_parse() {
        let err = GeoError::Parse("missing country_code".into());
        assert_eq!(err.to_string(), "parse error: missing country_code");
    }

    #[test]
    fn display_config() {
        let err = GeoError::Config("providers must not be empty".into());
        assert_eq!(err.to_string(), "config error: providers must not be empty");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GeoError>();
    }
}
