//! Feed retrieval.
//!
//! [`FeedFetcher`] is the seam between the poll cycles and the network.
//! [`HttpFetcher`] is the production implementation; tests substitute
//! their own.

use std::time::Duration;

use crate::error::FetchError;

/// Default per-request timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(4);

/// Default cap on response body size (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = "MeshAlerts/1.0 (+github)";

/// Retrieves raw feed bodies on demand.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetches `url` and returns its body as text.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on timeout, network failure, non-2xx status,
    /// or an oversized or undecodable body.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// `reqwest`-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Builds a fetcher sending `user_agent` on every request.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Network` if the HTTP client cannot be built
    /// (e.g. the TLS backend fails to initialize).
    pub fn new(user_agent: &str, max_body_bytes: usize) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            client,
            max_body_bytes,
        })
    }
}

#[async_trait::async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        tracing::trace!(url, "fetching feed");

        let response = tokio::time::timeout(timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout(timeout))?
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(FetchError::BodyTooLarge {
                limit: self.max_body_bytes,
            });
        }

        // Decoded by the declared charset; UTF-8 when none is declared.
        let body = tokio::time::timeout(timeout, response.text())
            .await
            .map_err(|_| FetchError::Timeout(timeout))?
            .map_err(|e| {
                if e.is_decode() {
                    FetchError::Body(e.to_string())
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        if body.len() > self.max_body_bytes {
            return Err(FetchError::BodyTooLarge {
                limit: self.max_body_bytes,
            });
        }

        Ok(body)
    }
}
