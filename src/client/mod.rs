//! Fusion API Clients
//!
//! Provides implementations of the domain ports:
//! - HTTP: the generic REST client used against a live Fusion endpoint
//! - Memory: an in-process Fusion used for tests and local dry runs

pub mod http;
pub mod memory;

pub use http::*;
pub use memory::*;

use std::time::Duration;

/// Connection settings for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Fusion host, without the `/api/<version>` suffix
    pub host: String,
    /// REST API version
    pub api_version: String,
    /// Bearer token presented on every request
    pub access_token: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "https://api.pure1.purestorage.com/fusion".to_string(),
            api_version: "1.1".to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(30),
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
        }
    }
}

impl ClientConfig {
    pub fn base_url(&self) -> String {
        format!(
            "{}/api/{}",
            self.host.trim_end_matches('/'),
            self.api_version
        )
    }
}
