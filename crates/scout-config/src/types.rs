//! Configuration types.
//!
//! ```toml
//! [llm]
//! backend = "ollama"
//! model = "llama3"
//!
//! [embedding]
//! provider = "ollama"
//! model = "all-minilm"
//!
//! [research]
//! max_iterations = 10
//! data_dir = "./data"
//!
//! [search]
//! provider = "duckduckgo"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration. Every section is optional; missing sections take
/// their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoutConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<ResearchConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryConfig>,
}

impl ScoutConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: ScoutConfig) {
        if other.llm.is_some() {
            self.llm = other.llm;
        }
        if other.embedding.is_some() {
            self.embedding = other.embedding;
        }
        if other.research.is_some() {
            self.research = other.research;
        }
        if other.search.is_some() {
            self.search = other.search;
        }
        if other.memory.is_some() {
            self.memory = other.memory;
        }
    }

    /// Effective `[llm]` section.
    pub fn llm(&self) -> LlmConfig {
        self.llm.clone().unwrap_or_default()
    }

    /// Effective `[embedding]` section.
    pub fn embedding(&self) -> EmbeddingConfig {
        self.embedding.clone().unwrap_or_default()
    }

    /// Effective `[research]` section.
    pub fn research(&self) -> ResearchConfig {
        self.research.clone().unwrap_or_default()
    }

    /// Effective `[search]` section.
    pub fn search(&self) -> SearchConfig {
        self.search.clone().unwrap_or_default()
    }

    /// Effective `[memory]` section.
    pub fn memory(&self) -> MemoryConfig {
        self.memory.clone().unwrap_or_default()
    }

    /// Check values that would make a session misbehave.
    pub fn validate(&self) -> Result<()> {
        let research = self.research();
        if research.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "research.max_iterations must be at least 1".to_string(),
            ));
        }
        if research.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "research.chunk_size must be at least 1".to_string(),
            ));
        }
        if research.chunk_overlap >= research.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "research.chunk_overlap ({}) must be smaller than research.chunk_size ({})",
                research.chunk_overlap, research.chunk_size
            )));
        }
        if research.top_k == 0 {
            return Err(ConfigError::Invalid(
                "research.top_k must be at least 1".to_string(),
            ));
        }

        let llm = self.llm();
        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                llm.temperature
            )));
        }
        if llm.backend == Backend::Custom && llm.base_url.is_none() {
            return Err(ConfigError::Invalid(
                "llm.base_url is required when backend = \"custom\"".to_string(),
            ));
        }

        if self.embedding().dimensions == Some(0) {
            return Err(ConfigError::Invalid(
                "embedding.dimensions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Text-generation backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub backend: Backend,
    pub model: String,
    /// Base URL override. Required for `custom`.
    pub base_url: Option<String>,
    /// API key (prefer the backend's environment variable).
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Retries for transient HTTP failures.
    pub retry_max: u32,
    /// Per-request timeout; the backend preset applies when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Ollama,
            model: "llama3".to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.7,
            max_tokens: 2048,
            retry_max: 3,
            timeout_secs: None,
        }
    }
}

impl LlmConfig {
    /// Whether a key is written directly in the config file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// API key from the config file, falling back to the backend's env var.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(self.backend.env_var()).ok())
            .filter(|k| !k.is_empty())
    }
}

/// Supported LLM backend providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Ollama,
    Openai,
    Groq,
    Custom,
}

impl Backend {
    /// Environment variable name for this backend's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            Backend::Ollama => "OLLAMA_API_KEY",
            Backend::Openai => "OPENAI_API_KEY",
            Backend::Groq => "GROQ_API_KEY",
            Backend::Custom => "LLM_API_KEY",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Ollama => "Ollama",
            Backend::Openai => "OpenAI",
            Backend::Groq => "Groq",
            Backend::Custom => "Custom",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedding Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Embedding provider settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    /// Model name; provider default when unset.
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Output dimensions. Default depends on provider.
    pub dimensions: Option<usize>,
}

impl EmbeddingConfig {
    /// Effective dimensions for the configured provider.
    pub fn effective_dimensions(&self) -> usize {
        self.dimensions.unwrap_or(match self.provider {
            EmbeddingProvider::Openai => 1536,
            EmbeddingProvider::Ollama | EmbeddingProvider::Mock => 384,
        })
    }

    /// API key from config, then `OPENAI_API_KEY` for the openai provider.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| match self.provider {
            EmbeddingProvider::Openai => std::env::var("OPENAI_API_KEY").ok(),
            _ => None,
        })
    }
}

/// Supported embedding providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama daemon (default, offline-first).
    #[default]
    Ollama,
    /// OpenAI embeddings API.
    Openai,
    /// Deterministic mock embedder, no network.
    Mock,
}

impl EmbeddingProvider {
    /// Provider name as understood by the embedder factory.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingProvider::Ollama => "ollama",
            EmbeddingProvider::Openai => "openai",
            EmbeddingProvider::Mock => "mock",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Research Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Research loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Planning steps allowed before an answer is forced.
    pub max_iterations: u32,
    /// Knowledge base chunks retrieved per query.
    pub top_k: usize,
    /// Characters per document chunk.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Per-handler timeout. `None` disables it.
    pub handler_timeout_secs: Option<u64>,
    /// Timeout for each planning call. `None` disables it.
    pub planner_timeout_secs: Option<u64>,
    /// Directory scanned for documents to read. Defaults to `./data`.
    pub data_dir: Option<PathBuf>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            top_k: 5,
            chunk_size: 1000,
            chunk_overlap: 200,
            handler_timeout_secs: Some(120),
            planner_timeout_secs: Some(60),
            data_dir: None,
        }
    }
}

impl ResearchConfig {
    /// Document directory, `./data` when unset.
    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("data"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Search Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Web search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub provider: SearchProvider,
    /// API key for providers that need one.
    pub api_key: Option<String>,
    pub max_results: usize,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProvider::DuckDuckGo,
            api_key: None,
            max_results: 5,
            timeout_secs: 30,
        }
    }
}

impl SearchConfig {
    /// API key from config, then the provider's env var.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.provider
                .env_var()
                .and_then(|var| std::env::var(var).ok())
        })
    }
}

/// Supported web search providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    /// DuckDuckGo HTML results, no key required.
    #[default]
    #[serde(alias = "ddg")]
    DuckDuckGo,
    Brave,
    Serper,
    Tavily,
}

impl SearchProvider {
    /// Environment variable holding the provider's key.
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            SearchProvider::DuckDuckGo => None,
            SearchProvider::Brave => Some("BRAVE_API_KEY"),
            SearchProvider::Serper => Some("SERPER_API_KEY"),
            SearchProvider::Tavily => Some("TAVILY_API_KEY"),
        }
    }

    /// Provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchProvider::DuckDuckGo => "duckduckgo",
            SearchProvider::Brave => "brave",
            SearchProvider::Serper => "serper",
            SearchProvider::Tavily => "tavily",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Knowledge store settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Path to the SQLite database.
    /// Relative paths are resolved from the data directory.
    pub database: Option<PathBuf>,
}

impl MemoryConfig {
    /// Database path, resolved against `data_dir`.
    pub fn database_path(&self, data_dir: &std::path::Path) -> PathBuf {
        match self.database {
            Some(ref p) if p.is_absolute() => p.clone(),
            Some(ref p) => data_dir.join(p),
            None => data_dir.join("knowledge.db"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ScoutConfig::from_toml("").unwrap();
        assert_eq!(config, ScoutConfig::new());

        assert_eq!(config.llm().backend, Backend::Ollama);
        assert_eq!(config.llm().model, "llama3");
        assert_eq!(config.llm().temperature, 0.7);
        assert_eq!(config.research().max_iterations, 10);
        assert_eq!(config.research().top_k, 5);
        assert_eq!(config.research().chunk_size, 1000);
        assert_eq!(config.research().chunk_overlap, 200);
        assert_eq!(config.search().max_results, 5);
        assert_eq!(config.search().provider, SearchProvider::DuckDuckGo);
        assert_eq!(config.embedding().effective_dimensions(), 384);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let config = ScoutConfig::from_toml(
            r#"
[llm]
backend = "groq"
model = "llama-3.1-8b-instant"
temperature = 0.2

[embedding]
provider = "openai"
model = "text-embedding-3-small"

[research]
max_iterations = 4
data_dir = "/srv/papers"
handler_timeout_secs = 30

[search]
provider = "tavily"
max_results = 8

[memory]
database = "kb.db"
"#,
        )
        .unwrap();

        let llm = config.llm();
        assert_eq!(llm.backend, Backend::Groq);
        assert_eq!(llm.temperature, 0.2);
        assert_eq!(llm.max_tokens, 2048);

        assert_eq!(config.embedding().provider, EmbeddingProvider::Openai);
        assert_eq!(config.embedding().effective_dimensions(), 1536);

        let research = config.research();
        assert_eq!(research.max_iterations, 4);
        assert_eq!(research.top_k, 5);
        assert_eq!(research.handler_timeout_secs, Some(30));
        assert_eq!(research.documents_dir(), PathBuf::from("/srv/papers"));

        assert_eq!(config.search().provider, SearchProvider::Tavily);
        assert_eq!(config.search().max_results, 8);

        assert_eq!(
            config.memory().database_path(Path::new("/var/scout")),
            PathBuf::from("/var/scout/kb.db")
        );
    }

    #[test]
    fn test_search_provider_alias() {
        let config = ScoutConfig::from_toml("[search]\nprovider = \"ddg\"").unwrap();
        assert_eq!(config.search().provider, SearchProvider::DuckDuckGo);
    }

    #[test]
    fn test_merge_replaces_sections() {
        let mut base = ScoutConfig::from_toml(
            r#"
[llm]
model = "base"

[research]
max_iterations = 3
"#,
        )
        .unwrap();
        let overlay = ScoutConfig::from_toml("[llm]\nmodel = \"project\"").unwrap();

        base.merge(overlay);
        assert_eq!(base.llm().model, "project");
        assert_eq!(base.research().max_iterations, 3);
    }

    #[test]
    fn test_toml_roundtrip_keeps_sections() {
        let mut config = ScoutConfig::new();
        config.research = Some(ResearchConfig {
            max_iterations: 2,
            ..Default::default()
        });

        let text = config.to_toml().unwrap();
        assert!(text.contains("[research]"));
        assert!(!text.contains("[llm]"));
        assert_eq!(ScoutConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ScoutConfig::from_toml("[research]\nmax_iterations = 0").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config =
            ScoutConfig::from_toml("[research]\nchunk_size = 100\nchunk_overlap = 100").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));

        let config = ScoutConfig::from_toml("[llm]\nbackend = \"custom\"").unwrap();
        assert!(config.validate().is_err());

        let config = ScoutConfig::from_toml("[llm]\ntemperature = 3.5").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_path_defaults() {
        let memory = MemoryConfig::default();
        assert_eq!(
            memory.database_path(Path::new("/data")),
            PathBuf::from("/data/knowledge.db")
        );

        let memory = MemoryConfig {
            database: Some(PathBuf::from("/abs/kb.db")),
        };
        assert_eq!(
            memory.database_path(Path::new("/data")),
            PathBuf::from("/abs/kb.db")
        );
    }

    #[test]
    fn test_plaintext_key_detection() {
        let mut llm = LlmConfig::default();
        assert!(!llm.has_plaintext_api_key());
        llm.api_key = Some("sk-secret".to_string());
        assert!(llm.has_plaintext_api_key());
        assert_eq!(llm.resolve_api_key().as_deref(), Some("sk-secret"));
    }
}
