//! Geolocation provider implementations.
//!
//! Each module provides a struct implementing [`crate::provider::GeoProviderTrait`]
//! for one public "where am I" JSON endpoint.

pub mod ip_api_com;
pub mod ipapi_co;
pub mod ipwho_is;

pub use ip_api_com::IpApiComProvider;
pub use ipapi_co::IpApiCoProvider;
pub use ipwho_is::IpWhoIsProvider;
