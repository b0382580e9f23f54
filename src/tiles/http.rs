//! HTTP client abstraction for testability

use std::time::Duration;

use crate::{MapError, Result};

/// User-Agent sent with every tile request. Public tile servers such as
/// OpenStreetMap reject anonymous clients.
pub const DEFAULT_USER_AGENT: &str = concat!("tilelet/", env!("CARGO_PKG_VERSION"));

/// Trait for HTTP client operations.
///
/// Implementations classify failures: transport problems are
/// [`MapError::Network`], non-2xx answers are [`MapError::HttpStatus`].
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request and returns the response body.
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Real HTTP client implementation using blocking reqwest.
///
/// Must be created and used outside an async context; the tile manager
/// calls providers from blocking worker threads.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with the default user agent and a 10s timeout.
    pub fn new() -> Result<Self> {
        Self::with_settings(DEFAULT_USER_AGENT, 10)
    }

    /// Creates a new ReqwestClient with a custom user agent and timeout.
    pub fn with_settings(user_agent: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| MapError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| MapError::Network(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MapError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| MapError::Network(format!("failed to read body from {}: {}", url, e)))
    }
}
