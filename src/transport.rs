//! HTTP transport boundary
//!
//! The search client only needs "GET this URL, give me the body". The
//! `Transport` trait keeps that seam open so tests and embedders can supply
//! their own fetcher; `HttpTransport` is the default `reqwest` implementation.

use futures::future::BoxFuture;
use reqwest::{redirect, Client};
use thiserror::Error;

use crate::config::TransportConfig;

/// Errors that can occur while fetching a response
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// Network, TLS, timeout or HTTP status failure
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Failure reported by a custom transport
    #[error("{0}")]
    Other(String),
}

/// Performs a GET and returns the raw response body
pub trait Transport: Send + Sync {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, TransportError>>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a client honouring the timeout, redirect limit, user agent and
    /// certificate-validation settings
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        if config.accept_invalid_certs {
            tracing::warn!("TLS certificate validation is disabled");
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(TransportError::Build)?;
        Ok(Self { client })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, TransportError>> {
        Box::pin(async move {
            let response = self.client.get(url).send().await?.error_for_status()?;
            let body = response.bytes().await?;
            Ok(body.to_vec())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds_client() {
        assert!(HttpTransport::new(&TransportConfig::default()).is_ok());
    }

    #[test]
    fn test_insecure_config_builds_client() {
        let config = TransportConfig {
            accept_invalid_certs: true,
            ..TransportConfig::default()
        };
        assert!(HttpTransport::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        let transport = HttpTransport::new(&TransportConfig {
            timeout: std::time::Duration::from_secs(2),
            ..TransportConfig::default()
        })
        .unwrap();

        // Port 9 on localhost is the discard service and is closed almost everywhere
        let result = transport.get("http://127.0.0.1:9/search").await;
        assert!(matches!(result, Err(TransportError::Request(_))));
    }

    #[test]
    fn test_other_error_message_is_verbatim() {
        let err = TransportError::Other("connection reset".to_string());
        assert_eq!(err.to_string(), "connection reset");
    }
}
