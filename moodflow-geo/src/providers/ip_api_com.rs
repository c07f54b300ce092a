//! ip-api.com — answers `{"status": "success", "countryCode": "US"}`.
//!
//! Failures come back as `200 OK` with `"status": "fail"` and a `message`.

use serde::Deserialize;

use crate::error::GeoError;
use crate::http::get_text;
use crate::provider::GeoProviderTrait;
use crate::types::{CountryCode, GeoProvider};

/// ip-api.com client.
pub struct IpApiComProvider {
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiComResponse {
    status: String,
    message: Option<String>,
    country_code: Option<String>,
}

impl IpApiComProvider {
    /// Provider pointed at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl Default for IpApiComProvider {
    fn default() -> Self {
        Self::new(GeoProvider::IpApiCom.default_endpoint())
    }
}

impl GeoProviderTrait for IpApiComProvider {
    async fn lookup(&self, client: &reqwest::Client) -> Result<CountryCode, GeoError> {
        let body = get_text(client, &self.endpoint).await?;
        parse_response(&body)
    }

    fn provider_type(&self) -> GeoProvider {
        GeoProvider::IpApiCom
    }
}

/// Extract the country code from an ip-api.com body.
pub fn parse_response(body: &str) -> Result<CountryCode, GeoError> {
    let parsed: IpApiComResponse = serde_json::from_str(body)
        .map_err(|e| GeoError::Parse(format!("ip-api.com body: {e}")))?;
    if parsed.status != "success" {
        return Err(GeoError::Http(format!(
            "ip-api.com refused lookup: {}",
            parsed.message.unwrap_or_else(|| parsed.status.clone())
        )));
    }
    let raw = parsed
        .country_code
        .ok_or_else(|| GeoError::Parse("ip-api.com body missing countryCode".into()))?;
    CountryCode::parse(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_country_code() {
        let body = r#"{"status":"success","country":"Mexico","countryCode":"MX","query":"198.51.100.2"}"#;
        assert_eq!(parse_response(body).unwrap().as_str(), "MX");
    }

    #[test]
    fn fail_status_is_error() {
        let body = r#"{"status":"fail","message":"reserved range","query":"127.0.0.1"}"#;
        let err = parse_response(body).unwrap_err();
        assert!(err.to_string().contains("reserved range"));
    }

    #[test]
    fn missing_status_is_parse_error() {
        assert!(matches!(
            parse_response(r#"{"countryCode":"MX"}"#).unwrap_err(),
            GeoError::Parse(_)
        ));
    }
}
