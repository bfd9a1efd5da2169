//! fetchcache library
//!
//! A time-bounded, version-aware cache for JSON HTTP responses. Responses are
//! kept in a single JSON file and served back until they are older than the
//! requested `max_age`, or until the store's schema version changes.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;

pub use cache::{cache_key, CacheEntry, CacheStore, StoreError};
pub use config::CacheConfig;
pub use error::{FetchError, TransformError};
pub use fetch::{
    CachedFetch, FetchOptions, Fetcher, HttpFetcher, NetworkError, Query, QueryValue, Transform,
};
