//! Retry message formatting
//!
//! Classifies a failed attempt into a [`RetryErrorType`] and renders the
//! uniform log lines the executor emits while retrying and after giving up.

use std::time::Duration;

use super::transport::TransportError;

/// Classification of retry errors for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request or connect timed out
    NetworkTimeout,
    /// Connection refused, DNS failure, or other offline scenarios
    NetworkOffline,
    /// HTTP 429 rate limit exceeded
    RateLimit,
    /// HTTP 5xx server error
    ServerError(u16),
    /// Other 4xx client errors
    ClientError(u16),
    /// 2xx body that was not a JSON `MRData` envelope
    MalformedResponse,
    /// Generic fallback when no better classification fits
    NetworkGeneric,
}

impl RetryErrorType {
    /// User-friendly description string used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::ClientError(code) => match code {
                400 => "bad request",
                404 => "resource not found",
                _ => "client error",
            },
            Self::MalformedResponse => "malformed response",
            Self::NetworkGeneric => "network error",
        }
    }

    /// Suggested remediation shown after the final failure.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection and firewall settings",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit => "Wait before retrying or enable the disk cache to avoid refetching",
            Self::ServerError(_) => "The results API may be experiencing issues, try again later",
            Self::ClientError(_) => "Check the season, round and resource arguments",
            Self::MalformedResponse => "Verify --base-url points at an Ergast-compatible API",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured
    pub max_attempts: u32,
    /// Type of error that triggered retry
    pub error_type: RetryErrorType,
    /// Delay before the next attempt
    pub backoff_duration: Duration,
    /// Endpoint path and query that failed
    pub endpoint: String,
    /// Original error message for details
    pub error_message: String,
}

impl RetryContext {
    /// Build a context for one failed attempt
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        backoff_duration: Duration,
        endpoint: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            backoff_duration,
            endpoint: endpoint.into(),
            error_message: error_message.into(),
        }
    }

    /// Format standardized retry message with attempt counters and context.
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying (attempt {}/{}) after {} - waiting {:.1} seconds... ({})",
            self.attempt,
            self.max_attempts,
            self.error_type.description(),
            self.backoff_duration.as_secs_f64(),
            self.endpoint
        )
    }

    /// Format retry success message when a previous attempt eventually works.
    ///
    /// `error_type` is the failure the earlier attempt recovered from.
    pub fn format_success(&self) -> String {
        format!(
            "Retry attempt {}/{} succeeded after {} ({})",
            self.attempt,
            self.max_attempts,
            self.error_type.description(),
            self.endpoint
        )
    }

    /// Format final failure summary with actionable suggestions.
    pub fn format_failure(&self) -> String {
        let mut lines = vec![
            format!("[FAILED] Request failed after {} attempts", self.attempt),
            format!("  Last error: {}", self.error_message),
            format!("  Endpoint: {}", self.endpoint),
            "  Suggestions:".to_string(),
        ];
        for suggestion in self.format_suggestions() {
            lines.push(format!("    - {suggestion}"));
        }
        lines.join("\n")
    }

    /// Derive suggestions tailored to the current retry context.
    pub fn format_suggestions(&self) -> Vec<String> {
        vec![
            self.error_type.suggestion().to_string(),
            format!(
                "Try increasing --max-retries (current: {})",
                self.max_attempts
            ),
        ]
    }
}

/// Extract a [`RetryErrorType`] from an HTTP status or transport error.
pub fn extract_error_type(status: Option<u16>, err: Option<&TransportError>) -> RetryErrorType {
    if let Some(status) = status {
        match status {
            429 => return RetryErrorType::RateLimit,
            500..=599 => return RetryErrorType::ServerError(status),
            400..=499 => return RetryErrorType::ClientError(status),
            200..=299 => return RetryErrorType::MalformedResponse,
            _ => {}
        }
    }

    if let Some(err) = err {
        if err.is_timeout() {
            return RetryErrorType::NetworkTimeout;
        }
        if err.is_connect() {
            return RetryErrorType::NetworkOffline;
        }
    }

    RetryErrorType::NetworkGeneric
}
