//! Error types for scout-llm.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

// ─────────────────────────────────────────────────────────────────────────────
// Rate Limit Info
// ─────────────────────────────────────────────────────────────────────────────

/// Details of an HTTP 429 response.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub message: String,
    /// Parsed from `Retry-After` when given in seconds.
    pub retry_after: Option<Duration>,
}

impl RateLimitInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry_after: None,
        }
    }

    /// Parse rate limit info from a message and an optional `Retry-After` header.
    pub fn from_header(message: impl Into<String>, retry_after_header: Option<&str>) -> Self {
        Self {
            message: message.into(),
            retry_after: retry_after_header.and_then(parse_retry_after_header),
        }
    }
}

impl std::fmt::Display for RateLimitInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(retry_after) = self.retry_after {
            write!(f, " (retry after {:.2}s)", retry_after.as_secs_f64())?;
        }
        Ok(())
    }
}

/// Parse a Retry-After header value given in whole seconds.
fn parse_retry_after_header(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Error
// ─────────────────────────────────────────────────────────────────────────────

/// Failures talking to a completion or embedding endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider answered with an error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The provider could not be reached. Retried.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A body could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP 429. Retried, honouring `Retry-After` when present.
    #[error("Rate limit exceeded: {0}")]
    RateLimit(RateLimitInfo),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LlmError {
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit(RateLimitInfo::new(message))
    }

    /// Provider-requested delay, for rate limit errors only.
    pub fn retry_after(&self) -> Option<Duration> {
        if let Self::RateLimit(info) = self {
            info.retry_after
        } else {
            None
        }
    }

    /// Whether [`with_retry`](crate::with_retry) should try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimit(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::Serialization(format!("Malformed response body: {}", err))
        } else if err.is_timeout() {
            LlmError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            let target = err.url().map(|u| u.to_string()).unwrap_or_default();
            LlmError::Network(format!("Could not connect to {}: {}", target, err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Serialization(err.to_string())
    }
}
