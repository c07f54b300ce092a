//! Shared HTTP client for geolocation providers.

use crate::config::GeoConfig;
use crate::error::GeoError;
use std::time::Duration;

/// Default User-Agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("moodflow-geo/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] configured for provider requests.
///
/// The client has the per-provider timeout from config, a bounded
/// redirect policy, and either the configured or the default User-Agent.
///
/// # Errors
///
/// Returns [`GeoError::Http`] if the client cannot be constructed.
pub fn build_client(config: &GeoConfig) -> Result<reqwest::Client, GeoError> {
    let ua = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(3))
        .build()
        .map_err(|e| GeoError::Http(format!("failed to build HTTP client: {e}")))
}

/// GET `url` and return the response body, mapping non-2xx statuses to errors.
pub(crate) async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, GeoError> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            GeoError::Timeout(e.to_string())
        } else {
            GeoError::Http(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(GeoError::Http(format!("status {}", status.as_u16())));
    }

    response
        .text()
        .await
        .map_err(|e| GeoError::Http(format!("failed to read body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_user_agent_names_crate() {
        assert!(DEFAULT_USER_AGENT.starts_with("moodflow-geo/"));
    }

    #[test]
    fn build_client_with_default_config() {
        let client = build_client(&GeoConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn build_client_with_custom_ua() {
        let config = GeoConfig {
            user_agent: Some("MoodFlowTest/1.0".into()),
            ..Default::default()
        };
        assert!(build_client(&config).is_ok());
    }
}
