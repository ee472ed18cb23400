//! HTTP transport seam
//!
//! The executor never touches `reqwest` directly: it hands a URL and query
//! pairs to a [`Transport`] and gets back the status, the `Retry-After`
//! header and the body text. Interpretation (429 handling, JSON parsing,
//! retries) stays in [`super::http`].

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// HTTP connect timeout (seconds)
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Per-request timeout (seconds)
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 10;

/// What came back from one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw `Retry-After` header, if present
    pub retry_after: Option<String>,
    /// Response body as text
    pub body: String,
}

impl RawResponse {
    /// 200 response with a body
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    /// Response with an arbitrary status
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    /// Attach a `Retry-After` header value
    pub fn retry_after(mut self, value: impl Into<String>) -> Self {
        self.retry_after = Some(value.into());
        self
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Broad class of a transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request or connect timed out
    Timeout,
    /// Connection refused, DNS failure, TLS failure
    Connect,
    /// Anything else (body read, redirect loop, ...)
    Other,
}

/// A request that produced no HTTP response
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    /// Failure class
    pub kind: TransportErrorKind,
    /// Human-readable cause
    pub message: String,
}

impl TransportError {
    /// Build an error of the given kind
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether this was a timeout
    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }

    /// Whether the connection could not be established
    pub fn is_connect(&self) -> bool {
        self.kind == TransportErrorKind::Connect
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, err.to_string())
    }
}

/// Performs a single GET; no retries, no interpretation
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `GET url?query`
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<RawResponse, TransportError>;
}

/// Build the pooled HTTP client held for a client's lifetime
pub fn build_http_client(
    request_timeout: Duration,
    connect_timeout: Duration,
) -> Result<Client, TransportError> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            TransportError::new(
                TransportErrorKind::Other,
                format!("Failed to build HTTP client: {e}"),
            )
        })
}

/// [`Transport`] backed by a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client with the default timeouts
    pub fn with_default_timeouts() -> Result<Self, TransportError> {
        let client = build_http_client(
            Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
            Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS),
        )?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<RawResponse, TransportError> {
        debug!("Making GET request to: {} with {} params", url, query.len());

        let response = self.client.get(url).query(query).send().await?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}
