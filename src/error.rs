//! Error types surfaced by cached fetches

use thiserror::Error;

use crate::cache::StoreError;
use crate::fetch::NetworkError;

/// Error returned by a failing transform
pub type TransformError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during a cached fetch
///
/// Nothing is retried or swallowed: network failures never fall back to a stale
/// entry, and no entry is written for a call that fails.
#[derive(Debug, Error)]
pub enum FetchError {
    /// An argument or option had the wrong shape. Raised before any I/O.
    #[error("Expected `{option}` to be a `{expected}`, got `{got}`")]
    InvalidArgument {
        option: String,
        expected: &'static str,
        got: &'static str,
    },

    /// The network retrieval failed
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Reading or writing the cache store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The caller-supplied transform rejected the response
    #[error("Transform failed: {0}")]
    Transform(#[source] TransformError),
}

impl FetchError {
    pub(crate) fn invalid_argument(
        option: impl Into<String>,
        expected: &'static str,
        got: &'static str,
    ) -> Self {
        FetchError::InvalidArgument {
            option: option.into(),
            expected,
            got,
        }
    }
}
