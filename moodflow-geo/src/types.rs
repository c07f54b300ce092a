//! Core types: provider identification and validated country codes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GeoError;

/// An ISO 3166-1 alpha-2 country code, always upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse and normalise a raw country code (`"in"` → `"IN"`).
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Parse`] unless the trimmed input is exactly two
    /// ASCII letters.
    pub fn parse(raw: &str) -> Result<Self, GeoError> {
        let trimmed = raw.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(GeoError::Parse(format!(
                "invalid country code: {trimmed:?}"
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The upper-case two-letter code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CountryCode {
    type Error = GeoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CountryCode> for String {
    fn from(value: CountryCode) -> Self {
        value.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supported IP geolocation providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeoProvider {
    /// ipapi.co — HTTPS, generous free tier, occasionally rate limits.
    IpApiCo,
    /// ip-api.com — fast, free tier is HTTP only.
    IpApiCom,
    /// ipwho.is — HTTPS, no key required.
    IpWhoIs,
}

impl GeoProvider {
    /// Human-readable provider name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IpApiCo => "ipapi.co",
            Self::IpApiCom => "ip-api.com",
            Self::IpWhoIs => "ipwho.is",
        }
    }

    /// Public endpoint that returns the caller's own location as JSON.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::IpApiCo => "https://ipapi.co/json/",
            Self::IpApiCom => "http://ip-api.com/json/",
            Self::IpWhoIs => "https://ipwho.is/",
        }
    }

    /// All provider variants in default priority order.
    pub fn all() -> &'static [GeoProvider] {
        &[Self::IpApiCo, Self::IpApiCom, Self::IpWhoIs]
    }
}

impl fmt::Display for GeoProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
