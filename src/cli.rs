//! Command-line interface parsing for fetchcache
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! the library's cache configuration and per-request options.

use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::CacheConfig;
use crate::fetch::{FetchOptions, Query};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// A `--query` argument was not of the form KEY=VALUE
    #[error("Invalid query parameter: '{0}'. Expected KEY=VALUE")]
    InvalidQuery(String),

    /// A `--pointer` argument was not a JSON pointer
    #[error("Invalid JSON pointer: '{0}'. Pointers start with '/'")]
    InvalidPointer(String),

    /// The JSON pointer did not select anything in the response
    #[error("JSON pointer '{0}' did not match the response")]
    PointerNotFound(String),

    /// Neither a URL nor --clear was given
    #[error("A URL is required unless --clear is given")]
    MissingUrl,
}

/// fetchcache - fetch JSON through a persistent, version-aware cache
#[derive(Parser, Debug)]
#[command(name = "fetchcache")]
#[command(about = "Fetch a JSON resource through a persistent, version-aware cache")]
#[command(version)]
pub struct Cli {
    /// URL to fetch
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Query parameter appended to the request, may be repeated
    ///
    /// Examples:
    ///   fetchcache https://api.example.com/search -q term=rust -q page=2
    #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_query_arg)]
    pub query: Vec<(String, String)>,

    /// Keep the response for this many milliseconds. Without it the cache is bypassed.
    #[arg(short, long, value_name = "MS")]
    pub max_age: Option<u64>,

    /// Cache file to use instead of the platform cache directory
    #[arg(long, value_name = "PATH", env = "FETCHCACHE_PATH")]
    pub cache: Option<PathBuf>,

    /// Schema version of the cached data. Changing it drops every entry.
    #[arg(long = "cache-version", value_name = "VERSION", env = "FETCHCACHE_VERSION")]
    pub cache_version: Option<String>,

    /// Print only the part of the response selected by this JSON pointer
    #[arg(long, value_name = "POINTER", value_parser = parse_pointer_arg)]
    pub pointer: Option<String>,

    /// Remove every cached response and exit; cannot be combined with a URL
    #[arg(long, conflicts_with = "url")]
    pub clear: bool,
}

/// Parses a KEY=VALUE query argument.
///
/// Only the first `=` separates key and value, so values may contain `=`.
pub fn parse_query_arg(s: &str) -> Result<(String, String), CliError> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(CliError::InvalidQuery(s.to_string())),
    }
}

/// Validates a JSON pointer argument (RFC 6901).
pub fn parse_pointer_arg(s: &str) -> Result<String, CliError> {
    if s.is_empty() || s.starts_with('/') {
        Ok(s.to_string())
    } else {
        Err(CliError::InvalidPointer(s.to_string()))
    }
}

/// Selects the value at `pointer` from a response
pub fn select_pointer(value: &Value, pointer: &str) -> Result<Value, CliError> {
    value
        .pointer(pointer)
        .cloned()
        .ok_or_else(|| CliError::PointerNotFound(pointer.to_string()))
}

impl Cli {
    /// The URL to fetch, required unless only clearing
    pub fn url(&self) -> Result<&str, CliError> {
        self.url.as_deref().ok_or(CliError::MissingUrl)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            cache: self.cache.clone(),
            version: self.cache_version.clone(),
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        let mut options = FetchOptions::new();

        if !self.query.is_empty() {
            options = options.query(self.query.iter().cloned().collect::<Query>());
        }

        if let Some(millis) = self.max_age {
            options = options.max_age(Duration::from_millis(millis));
        }

        options
    }
}
