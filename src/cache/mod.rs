//! Persistent response cache
//!
//! This module provides the file-backed store that holds fetched responses along
//! with the timestamp they were written at, and the key builder that maps a
//! request onto a store key.

mod key;
mod store;

pub use key::cache_key;
pub use store::{CacheEntry, CacheStore, StoreError};
