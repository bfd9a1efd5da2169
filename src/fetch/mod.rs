//! Cached fetch orchestration
//!
//! [`CachedFetch`] wraps a [`Fetcher`] with a [`CacheStore`]. Responses fetched
//! with a `max_age` are stored together with the time they were written and
//! served from the store until they are older than `max_age`. Staleness is only
//! checked when a key is looked up; nothing sweeps the store in the background.

mod http;
mod options;

pub use http::{Fetcher, HttpFetcher, NetworkError};
pub use options::{FetchOptions, Query, QueryValue, Transform, TransformFuture};

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::cache::{cache_key, CacheEntry, CacheStore};
use crate::config::CacheConfig;
use crate::error::FetchError;

/// A JSON fetcher with a persistent, version-aware response cache
///
/// The schema version is checked once, when the value is constructed: if the
/// store was written under a different version every entry is dropped.
///
/// Concurrent calls for the same key are not coalesced. Both may miss, both
/// fetch, and the last write wins.
#[derive(Debug)]
pub struct CachedFetch<F = HttpFetcher> {
    store: CacheStore,
    fetcher: F,
    version: String,
}

impl CachedFetch<HttpFetcher> {
    /// Opens the configured store and fetches over HTTP
    pub fn new(config: CacheConfig) -> Result<Self, FetchError> {
        Self::with_fetcher(config, HttpFetcher::new())
    }
}

impl<F: Fetcher> CachedFetch<F> {
    /// Opens the configured store and fetches through `fetcher`
    pub fn with_fetcher(config: CacheConfig, fetcher: F) -> Result<Self, FetchError> {
        let store = CacheStore::open(config.resolve_path()?)?;
        Self::from_store(store, config.resolve_version(), fetcher)
    }

    /// Wraps an already opened store, applying the version gate to it
    pub fn from_store(
        store: CacheStore,
        version: impl Into<String>,
        fetcher: F,
    ) -> Result<Self, FetchError> {
        let version = version.into();
        let previous = store.version()?;

        if store.sync_version(&version)? {
            info!(
                path = %store.path().display(),
                previous = previous.as_deref().unwrap_or_default(),
                current = %version,
                "cache version changed, dropped all entries"
            );
        }

        Ok(Self {
            store,
            fetcher,
            version,
        })
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Fetches `url`, serving it from the store while a stored copy is fresh
    ///
    /// On a miss the response is fetched, passed through the transform, and,
    /// when `max_age` is set and non-zero, stored before it is returned. The
    /// stored value is always the transformed one.
    ///
    /// # Errors
    /// * [`FetchError::InvalidArgument`] if `url` is empty, before any I/O
    /// * [`FetchError::Network`] if the retrieval fails; nothing is stored
    /// * [`FetchError::Transform`] if the transform rejects the response
    /// * [`FetchError::Store`] if the store cannot be written
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Value, FetchError> {
        let key = cache_key(url, options)?;

        if let Some(entry) = self.store.get(&key)? {
            if is_fresh(&entry, options.max_age, Utc::now()) {
                debug!(%key, "cache hit");
                return Ok(entry.data);
            }
            debug!(%key, created_at = %entry.created_at, "cache entry expired");
        }

        let query = options
            .query
            .as_ref()
            .map(|query| query.to_pairs())
            .unwrap_or_default();

        debug!(url, "fetching");
        let response = self.fetcher.get(url, &query).await?;

        let data = match &options.transform {
            Some(transform) => transform
                .apply(response)
                .await
                .map_err(FetchError::Transform)?,
            None => response,
        };

        // A zero max_age entry could never be served, so it is not written
        if options.max_age.is_some_and(|max_age| !max_age.is_zero()) {
            self.store.set(key.as_str(), CacheEntry::new(data.clone()))?;
            debug!(%key, "stored response");
        }

        Ok(data)
    }
}

/// Whether `entry` may still be served at `now`
fn is_fresh(entry: &CacheEntry, max_age: Option<Duration>, now: DateTime<Utc>) -> bool {
    let Some(max_age) = max_age else {
        return true;
    };

    match chrono::Duration::from_std(max_age) {
        Ok(max_age) => entry.age(now) < max_age,
        // Longer than chrono can represent: never expires
        Err(_) => true,
    }
}
