//! LLM Backend trait and implementations.
//!
//! This module defines the abstraction layer over text-generation providers.
//! A mock implementation for tests is available with the `testing` feature.

use async_trait::async_trait;
#[cfg(any(test, feature = "testing"))]
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LlmError, Result};
use crate::types::{CompletionRequest, CompletionResponse};
#[cfg(any(test, feature = "testing"))]
use crate::types::{StopReason, Usage};

// ─────────────────────────────────────────────────────────────────────────────
// Shared Retry Logic
// ─────────────────────────────────────────────────────────────────────────────

/// Execute an async operation with exponential backoff retry.
///
/// Retries only on transient errors (network failures, rate limits).
/// Non-retryable errors are returned immediately.
pub async fn with_retry<F, Fut, T>(
    max_retries: u32,
    initial_backoff: Duration,
    backend_name: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut backoff = initial_backoff;
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() || attempt >= max_retries => return Err(e),
            Err(e) => {
                let wait = e.retry_after().unwrap_or(backoff);
                attempt += 1;
                tracing::warn!(
                    backend = backend_name,
                    attempt = attempt,
                    max_retries = max_retries,
                    backoff_ms = wait.as_millis() as u64,
                    error = %e,
                    "Request failed, retrying"
                );
                tokio::time::sleep(wait).await;
                backoff *= 2;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for LLM backend providers.
///
/// Implementations provide the actual connection to a text-generation
/// service such as a local Ollama daemon or a hosted OpenAI-compatible API.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Execute a completion request and return the full response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Check if the backend is available and properly configured.
    async fn health_check(&self) -> Result<()>;
}

/// A backend that can be shared across threads.
pub type SharedBackend = Arc<dyn LlmBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────────────────

/// A mock backend for testing purposes.
///
/// Returns pre-configured responses in order, useful for deterministic testing
/// of planners and summarisers.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    responses: Mutex<Vec<CompletionResponse>>,
    request_log: Mutex<Vec<CompletionRequest>>,
    failure: Option<String>,
}

#[cfg(any(test, feature = "testing"))]
impl MockBackend {
    /// Create a new mock backend with the given responses.
    ///
    /// Responses are returned in order. If more requests are made than
    /// responses available, an error is returned.
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            name: "mock".to_string(),
            responses: Mutex::new(responses),
            request_log: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    /// Create a mock backend with a single text response.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::with_texts([text])
    }

    /// Create a mock backend that answers with each text in turn.
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let responses = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                CompletionResponse::new(
                    format!("mock_msg_{}", i + 1),
                    "mock-model",
                    text,
                    StopReason::EndTurn,
                    Usage::new(10, 20),
                )
            })
            .collect();
        Self::new(responses)
    }

    /// Create a mock backend whose every call fails with a backend error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(Vec::new())
        }
    }

    /// Get all requests that were made to this backend.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.request_log.lock().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().len()
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.request_log.lock().push(request);

        if let Some(ref message) = self.failure {
            return Err(LlmError::Backend(message.clone()));
        }

        let mut responses = self.responses.lock();
        if responses.is_empty() {
            return Err(LlmError::Backend(
                "MockBackend: no more responses available".to_string(),
            ));
        }
        Ok(responses.remove(0))
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn health_check(&self) -> Result<()> {
        match self.failure {
            Some(ref message) => Err(LlmError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_mock_backend_single_response() {
        let backend = MockBackend::with_text("Hello!");

        let request = CompletionRequest::new("test-model", vec![Message::user("Hi")], 100);
        let response = backend.complete(request).await.unwrap();

        assert_eq!(response.text(), "Hello!");
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_backend_multiple_responses() {
        let backend = MockBackend::with_texts(["First", "Second"]);

        let request = CompletionRequest::new("test-model", vec![Message::user("1")], 100);
        let r1 = backend.complete(request).await.unwrap();

        let request = CompletionRequest::new("test-model", vec![Message::user("2")], 100);
        let r2 = backend.complete(request).await.unwrap();

        assert_eq!(r1.text(), "First");
        assert_eq!(r2.text(), "Second");
        assert_eq!(backend.requests()[1].messages[0].content, "2");
    }

    #[tokio::test]
    async fn test_mock_backend_exhausted() {
        let backend = MockBackend::new(vec![]);

        let request = CompletionRequest::new("test-model", vec![Message::user("Hi")], 100);
        let result = backend.complete(request).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_backend_failing() {
        let backend = MockBackend::failing("ollama down");

        let request = CompletionRequest::new("test-model", vec![Message::user("Hi")], 100);
        let err = backend.complete(request).await.unwrap_err();

        assert!(err.to_string().contains("ollama down"));
        assert!(backend.health_check().await.is_err());
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_with_retry_retries_transient_errors() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, Duration::from_millis(1), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LlmError::Network("flaky".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_after_max() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(2, Duration::from_millis(1), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::Network("down".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(5, Duration::from_millis(1), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::Auth("bad key".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(LlmError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
