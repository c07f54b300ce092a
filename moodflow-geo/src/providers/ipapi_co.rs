//! ipapi.co — HTTPS endpoint, answers `{"country_code": "IN", ...}`.
//!
//! Rate-limited requests still return a JSON body, flagged with
//! `"error": true` and a `reason`.

use serde::Deserialize;

use crate::error::GeoError;
use crate::http::get_text;
use crate::provider::GeoProviderTrait;
use crate::types::{CountryCode, GeoProvider};

/// ipapi.co client.
pub struct IpApiCoProvider {
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct IpApiCoResponse {
    #[serde(default)]
    error: bool,
    reason: Option<String>,
    country_code: Option<String>,
}

impl IpApiCoProvider {
    /// Provider pointed at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl Default for IpApiCoProvider {
    fn default() -> Self {
        Self::new(GeoProvider::IpApiCo.default_endpoint())
    }
}

impl GeoProviderTrait for IpApiCoProvider {
    async fn lookup(&self, client: &reqwest::Client) -> Result<CountryCode, GeoError> {
        let body = get_text(client, &self.endpoint).await?;
        parse_response(&body)
    }

    fn provider_type(&self) -> GeoProvider {
        GeoProvider::IpApiCo
    }
}

/// Extract the country code from an ipapi.co body.
pub fn parse_response(body: &str) -> Result<CountryCode, GeoError> {
    let parsed: IpApiCoResponse = serde_json::from_str(body)
        .map_err(|e| GeoError::Parse(format!("ipapi.co body: {e}")))?;
    if parsed.error {
        return Err(GeoError::Http(format!(
            "ipapi.co refused lookup: {}",
            parsed.reason.unwrap_or_else(|| "unknown reason".into())
        )));
    }
    let raw = parsed
        .country_code
        .ok_or_else(|| GeoError::Parse("ipapi.co body missing country_code".into()))?;
    CountryCode::parse(&raw)
}
