//! OpenAI-compatible API backend implementation.
//!
//! This module provides `OpenAiBackend` which connects to any service that
//! speaks the chat-completions protocol: a local Ollama daemon (the default),
//! OpenAI itself, Groq, or a self-hosted gateway.

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{LlmBackend, with_retry};
use crate::error::{LlmError, RateLimitInfo, Result};
use crate::types::{CompletionRequest, CompletionResponse, Message, StopReason, Usage};

/// Default OpenAI API base URL.
const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

/// Default Ollama base URL (OpenAI-compatible endpoint).
pub const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434/v1";

/// Default timeout for hosted requests.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for authentication (optional for local services like Ollama).
    pub api_key: Option<String>,

    /// Base URL for the API.
    pub base_url: String,

    /// Model to use (can be overridden per request).
    pub model: Option<String>,

    /// Request timeout.
    pub timeout: Duration,

    /// Maximum retries for transient errors.
    pub max_retries: u32,

    /// Initial backoff duration for retries.
    pub retry_backoff: Duration,

    /// Name for this backend instance.
    pub name: String,
}

impl OpenAiConfig {
    /// Create a new config for OpenAI.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: DEFAULT_OPENAI_BASE.to_string(),
            model: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            name: "openai".to_string(),
        }
    }

    /// Create a new config for Groq.
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: Some("llama-3.1-8b-instant".to_string()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            name: "groq".to_string(),
        }
    }

    /// Create a new config for Ollama (local).
    pub fn ollama() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OLLAMA_BASE.to_string(),
            model: Some("llama3".to_string()),
            timeout: Duration::from_secs(600), // Longer timeout for local inference
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            name: "ollama".to_string(),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the backend name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set max retries.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI Backend
// ─────────────────────────────────────────────────────────────────────────────

/// OpenAI-compatible API backend.
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    /// Create a new OpenAI-compatible backend with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create an Ollama backend with default local settings.
    pub fn ollama() -> Result<Self> {
        Self::new(OpenAiConfig::ollama())
    }

    /// The active configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// Build the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Build the model listing endpoint URL.
    fn models_url(&self) -> String {
        format!("{}/models", self.config.base_url)
    }

    /// Add authentication headers to a request.
    fn add_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header(header::CONTENT_TYPE, "application/json");

        if let Some(ref api_key) = self.config.api_key {
            builder.header(header::AUTHORIZATION, format!("Bearer {}", api_key))
        } else {
            builder
        }
    }

    /// Convert our CompletionRequest to OpenAI-compatible format.
    fn to_openai_request(&self, request: &CompletionRequest) -> OpenAiChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(ref system) = request.system {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        messages.extend(request.messages.iter().map(|m| OpenAiMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        }));

        // Use config model if set, otherwise use request model
        let model = self
            .config
            .model
            .clone()
            .unwrap_or_else(|| request.model.clone());

        OpenAiChatRequest {
            model,
            messages,
            max_tokens: Some(request.max_tokens),
            temperature: request.temperature,
            stream: false,
        }
    }

    /// Handle a completion response.
    async fn handle_response(response: Response) -> Result<CompletionResponse> {
        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        let body = response.text().await?;
        let parsed: OpenAiChatResponse = serde_json::from_str(&body)?;

        Ok(parsed.into())
    }

    /// Handle an error response.
    async fn handle_error_response(response: Response) -> LlmError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<OpenAiErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

        match status.as_u16() {
            401 | 403 => LlmError::Auth(format!("Authentication failed: {}", message)),
            404 => LlmError::InvalidRequest(format!("Not found: {}", message)),
            429 => LlmError::RateLimit(RateLimitInfo::from_header(message, retry_after.as_deref())),
            500..=599 => LlmError::Backend(format!("Server error: {}", message)),
            _ => LlmError::Backend(message),
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let openai_request = self.to_openai_request(&request);

        tracing::debug!(
            backend = %self.config.name,
            model = %openai_request.model,
            messages = openai_request.messages.len(),
            "Sending OpenAI-compatible request"
        );

        with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            &self.config.name,
            || async {
                let response = self
                    .add_headers(self.client.post(self.completions_url()))
                    .json(&openai_request)
                    .send()
                    .await?;

                Self::handle_response(response).await
            },
        )
        .await
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .add_headers(self.client.get(self.models_url()))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        let Some(ref wanted) = self.config.model else {
            return Ok(());
        };

        let models: OpenAiModelList = response.json().await?;
        let available = models
            .data
            .iter()
            .any(|m| m.id == *wanted || m.id.split(':').next() == Some(wanted.as_str()));
        if available {
            Ok(())
        } else {
            Err(LlmError::Config(format!(
                "Model '{}' not available on {} ({})",
                wanted,
                self.config.name,
                models
                    .data
                    .iter()
                    .map(|m| m.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }
}

/// Create a shared OpenAI-compatible backend.
pub fn create_shared_backend(config: OpenAiConfig) -> Result<Arc<dyn LlmBackend>> {
    Ok(Arc::new(OpenAiBackend::new(config)?))
}

/// Convenience for a single-prompt request.
pub(crate) fn prompt_request(
    model: &str,
    prompt: &str,
    max_tokens: u32,
    temperature: f32,
) -> CompletionRequest {
    CompletionRequest::new(model, vec![Message::user(prompt)], max_tokens)
        .with_temperature(temperature)
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI API Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiChatResponse {
    id: String,
    choices: Vec<OpenAiChoice>,
    model: String,
    usage: Option<OpenAiUsage>,
}

impl From<OpenAiChatResponse> for CompletionResponse {
    fn from(resp: OpenAiChatResponse) -> Self {
        let (content, stop_reason) = match resp.choices.into_iter().next() {
            Some(choice) => {
                let stop = match choice.finish_reason.as_deref() {
                    Some("length") => StopReason::MaxTokens,
                    Some("stop_sequence") => StopReason::StopSequence,
                    _ => StopReason::EndTurn,
                };
                (choice.message.content.unwrap_or_default(), stop)
            }
            None => (String::new(), StopReason::EndTurn),
        };

        let usage = resp
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        CompletionResponse::new(resp.id, resp.model, content, stop_reason, usage)
    }
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiError {
    message: String,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiModelList {
    data: Vec<OpenAiModel>,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiModel {
    id: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_config() {
        let config = OpenAiConfig::openai("sk-test");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.base_url, DEFAULT_OPENAI_BASE);
        assert_eq!(config.name, "openai");
    }

    #[test]
    fn test_ollama_config() {
        let config = OpenAiConfig::ollama();
        assert!(config.api_key.is_none());
        assert!(config.base_url.contains("localhost:11434"));
        assert_eq!(config.model.as_deref(), Some("llama3"));
        assert_eq!(config.name, "ollama");
        assert_eq!(config.timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_config_builder() {
        let config = OpenAiConfig::ollama()
            .with_base_url("http://gpu-box:11434/v1/")
            .with_model("mistral")
            .with_name("lab")
            .with_timeout(Duration::from_secs(5))
            .with_max_retries(0);

        assert_eq!(config.base_url, "http://gpu-box:11434/v1");
        assert_eq!(config.model.as_deref(), Some("mistral"));
        assert_eq!(config.name, "lab");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_completions_url() {
        let backend = OpenAiBackend::ollama().unwrap();
        assert_eq!(
            backend.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(backend.models_url(), "http://localhost:11434/v1/models");
    }

    #[test]
    fn test_to_openai_request_prefers_config_model() {
        let backend = OpenAiBackend::ollama().unwrap();
        let request = prompt_request("ignored", "Which action?", 64, 0.7).with_system("planner");

        let wire = backend.to_openai_request(&request);
        assert_eq!(wire.model, "llama3");
        assert_eq!(wire.messages.len(), 2);
        assert_eq!(wire.messages[0].role, "system");
        assert_eq!(wire.messages[1].content, "Which action?");
        assert_eq!(wire.temperature, Some(0.7));
        assert!(!wire.stream);
    }

    #[test]
    fn test_openai_response_conversion() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "llama3",
            "choices": [{"message": {"role": "assistant", "content": "SEARCH"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 1}
        }"#;
        let parsed: OpenAiChatResponse = serde_json::from_str(body).unwrap();
        let response: CompletionResponse = parsed.into();

        assert_eq!(response.text(), "SEARCH");
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(response.usage.total(), 13);
    }

    #[test]
    fn test_openai_response_without_choices() {
        let body = r#"{"id": "x", "model": "m", "choices": []}"#;
        let parsed: OpenAiChatResponse = serde_json::from_str(body).unwrap();
        let response: CompletionResponse = parsed.into();

        assert_eq!(response.text(), "");
        assert_eq!(response.usage, Usage::default());
    }
}
