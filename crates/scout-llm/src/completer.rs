//! Prompt-in, text-out completion.
//!
//! Planners and summarisers only need a single string back for a single
//! prompt. [`TextCompleter`] is that narrow seam; [`BackendCompleter`] adapts
//! any [`LlmBackend`](crate::LlmBackend) to it.

use async_trait::async_trait;
use std::sync::Arc;

use crate::backend::SharedBackend;
use crate::error::Result;
use crate::openai::prompt_request;

/// Default sampling temperature for research prompts.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default generation budget per prompt.
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// A text-completion function: prompt in, generated text out.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    /// Complete a single prompt.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// A completer that can be shared across handlers.
pub type SharedCompleter = Arc<dyn TextCompleter>;

/// Adapts an [`LlmBackend`](crate::LlmBackend) into a [`TextCompleter`].
#[derive(Clone)]
pub struct BackendCompleter {
    backend: SharedBackend,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl BackendCompleter {
    /// Create a completer for the given backend and model.
    pub fn new(backend: SharedBackend, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum tokens generated per prompt.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Model requested on each call.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for BackendCompleter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendCompleter")
            .field("backend", &self.backend.name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[async_trait]
impl TextCompleter for BackendCompleter {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = prompt_request(&self.model, prompt, self.max_tokens, self.temperature);
        let response = self.backend.complete(request).await?;

        tracing::trace!(
            backend = self.backend.name(),
            prompt_chars = prompt.len(),
            output_tokens = response.usage.output_tokens,
            "Completion finished"
        );

        Ok(response.content)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::types::Role;

    #[tokio::test]
    async fn test_backend_completer_returns_text() {
        let backend = Arc::new(MockBackend::with_text("RETRIEVE"));
        let completer = BackendCompleter::new(backend.clone(), "llama3");

        let out = completer.complete("What next?").await.unwrap();
        assert_eq!(out, "RETRIEVE");

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "llama3");
        assert_eq!(requests[0].temperature, Some(DEFAULT_TEMPERATURE));
        assert_eq!(requests[0].messages[0].role, Role::User);
        assert_eq!(requests[0].messages[0].content, "What next?");
    }

    #[tokio::test]
    async fn test_backend_completer_settings() {
        let backend = Arc::new(MockBackend::with_text("ok"));
        let completer = BackendCompleter::new(backend.clone(), "m")
            .with_temperature(0.1)
            .with_max_tokens(32);

        completer.complete("p").await.unwrap();
        let request = &backend.requests()[0];
        assert_eq!(request.temperature, Some(0.1));
        assert_eq!(request.max_tokens, 32);
    }

    #[tokio::test]
    async fn test_backend_completer_propagates_errors() {
        let backend = Arc::new(MockBackend::failing("connection refused"));
        let completer = BackendCompleter::new(backend, "llama3");

        let err = completer.complete("p").await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
