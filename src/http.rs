//! HTTP client configuration for document fetches.
//!
//! Every refreshing key source owns one client built from [`HttpConfig`].

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

use crate::error::KeySourceError;

/// Default cap on fetched document size.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout (default: 10s)
    pub timeout: Duration,
    /// Connection timeout (default: 5s)
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Largest accepted response body (default: 1 MiB)
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            user_agent: concat!("jwks-validator/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl HttpConfig {
    /// Create a new HTTP config with custom timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a new HTTP config with custom connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Create a new HTTP config with custom user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Create a new HTTP config with a custom response body cap.
    #[must_use]
    pub const fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns [`KeySourceError::HttpClient`] if the client cannot be built
/// (e.g., TLS initialization fails).
pub fn build_http_client(config: &HttpConfig) -> Result<Client, KeySourceError> {
    ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .build()
        .map_err(|e| KeySourceError::HttpClient {
            reason: e.to_string(),
        })
}
