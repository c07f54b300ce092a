//! ipwho.is — answers `{"success": true, "country_code": "AE"}`.

use serde::Deserialize;

use crate::error::GeoError;
use crate::http::get_text;
use crate::provider::GeoProviderTrait;
use crate::types::{CountryCode, GeoProvider};

/// ipwho.is client.
pub struct IpWhoIsProvider {
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct IpWhoIsResponse {
    success: bool,
    message: Option<String>,
    country_code: Option<String>,
}

impl IpWhoIsProvider {
    /// Provider pointed at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl Default for IpWhoIsProvider {
    fn default() -> Self {
        Self::new(GeoProvider::IpWhoIs.default_endpoint())
    }
}

impl GeoProviderTrait for IpWhoIsProvider {
    async fn lookup(&self, client: &reqwest::Client) -> Result<CountryCode, GeoError> {
        let body = get_text(client, &self.endpoint).await?;
        parse_response(&body)
    }

    fn provider_type(&self) -> GeoProvider {
        GeoProvider::IpWhoIs
    }
}

/// Extract the country code from an ipwho.is body.
pub fn parse_response(body: &str) -> Result<CountryCode, GeoError> {
    let parsed: IpWhoIsResponse = serde_json::from_str(body)
        .map_err(|e| GeoError::Parse(format!("ipwho.is body: {e}")))?;
    if !parsed.success {
        return Err(GeoError::Http(format!(
            "ipwho.is refused lookup: {}",
            parsed.message.unwrap_or_else(|| "unknown reason".into())
        )));
    }
    let raw = parsed
        .country_code
        .ok_or_else(|| GeoError::Parse("ipwho.is body missing country_code".into()))?;
    CountryCode::parse(&raw)
}
