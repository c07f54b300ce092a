//! TTL cache for resolved countries.
//!
//! A host's country rarely changes within a session, so the answer is
//! cached per provider set. Uses [`moka`] for async-friendly expiry.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use moka::future::Cache;

use crate::types::{CountryCode, GeoProvider};

/// Maximum number of cached answers (one per distinct provider set).
const MAX_CACHE_ENTRIES: u64 = 16;

/// Cache key: hash of the sorted provider set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    provider_hash: u64,
}

impl CacheKey {
    /// `[IpApiCo, IpWhoIs]` and `[IpWhoIs, IpApiCo]` produce the same key.
    pub fn new(providers: &[GeoProvider]) -> Self {
        Self {
            provider_hash: hash_providers(providers),
        }
    }
}

/// Owned country cache. A TTL of zero disables caching entirely.
#[derive(Clone)]
pub struct CountryCache {
    inner: Option<Cache<CacheKey, CountryCode>>,
}

impl CountryCache {
    pub fn new(ttl_seconds: u64) -> Self {
        let inner = (ttl_seconds > 0).then(|| {
            Cache::builder()
                .max_capacity(MAX_CACHE_ENTRIES)
                .time_to_live(Duration::from_secs(ttl_seconds))
                .build()
        });
        Self { inner }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CountryCode> {
        match &self.inner {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    pub async fn insert(&self, key: CacheKey, country: CountryCode) {
        if let Some(cache) = &self.inner {
            cache.insert(key, country).await;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }
}

fn hash_providers(providers: &[GeoProvider]) -> u64 {
    let mut sorted: Vec<&GeoProvider> = providers.iter().collect();
    sorted.sort_by_key(|p| p.name());
    let mut hasher = DefaultHasher::new();
    for provider in sorted {
        provider.name().hash(&mut hasher);
    }
    hasher.finish()
}
