//! Network collaborator for cached fetches

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when retrieving a resource
#[derive(Debug, Error)]
pub enum NetworkError {
    /// HTTP request failed (connection, TLS, timeout)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// Failed to parse the response body as JSON
    #[error("Failed to parse response body as JSON: {0}")]
    Body(#[from] serde_json::Error),
}

/// Retrieves a JSON document
///
/// This is the seam between the cache and the network. [`HttpFetcher`] is the
/// real implementation; tests substitute their own.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issues a GET for `url` with `query` appended and decodes the body
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<Value, NetworkError>;
}

/// [`Fetcher`] backed by a reqwest client
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create a fetcher with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<Value, NetworkError> {
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
