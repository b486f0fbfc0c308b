//! Builds research components from the resolved configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use tracing::{debug, warn};

use scout_agent::{
    ARCHIVE_FILE, AnswerSynthesizer, ControllerConfig, DocumentReader, KnowledgeBase, Planner,
    ReadHandler, ResearchController, RetrieveHandler, SearchHandler, SearchProvider,
    SessionArchive, WebSearch, WebSearchConfig,
};
use scout_config::{Backend, ScoutConfig, SearchProvider as ConfiguredProvider};
use scout_llm::{
    BackendCompleter, EmbedderSpec, OpenAiConfig, SharedBackend, SharedCompleter,
    SharedEmbedder, build_embedder, create_shared_backend,
};
use scout_memory::KnowledgeStore;

use crate::commands::Context;

/// Used when the platform has no data directory.
const FALLBACK_DATA_DIR: &str = ".scout";

/// Per-run overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub max_iterations: Option<u32>,
    pub handler_timeout_secs: Option<u64>,
    pub documents_dir: Option<PathBuf>,
}

/// Resolved configuration plus the directories derived from it.
pub struct App {
    pub config: ScoutConfig,
    pub data_dir: PathBuf,
    pub config_files: Vec<PathBuf>,
}

impl App {
    /// Load and validate configuration. Warnings are logged, not fatal.
    pub fn load(ctx: &Context) -> Result<Self> {
        let loaded = scout_config::load_config_with_options(None, ctx.config_dir.as_deref())
            .context("failed to load configuration")?;

        for warning in &loaded.warnings {
            warn!("{}", warning);
        }
        let config_files: Vec<PathBuf> = loaded
            .loaded_from()
            .into_iter()
            .map(Path::to_path_buf)
            .collect();
        debug!(files = ?config_files, "Configuration loaded");

        let data_dir =
            scout_config::data_dir().unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR));

        Ok(Self {
            config: loaded.config,
            data_dir,
            config_files,
        })
    }

    // ── LLM ──────────────────────────────────────────────────────────────

    pub fn backend(&self) -> Result<SharedBackend> {
        let llm = self.config.llm();
        let api_key = llm.resolve_api_key();
        let missing_key = || {
            anyhow::anyhow!(
                "{} requires an API key. Set {} or configure [llm] api_key.",
                llm.backend,
                llm.backend.env_var()
            )
        };

        let mut config = match llm.backend {
            Backend::Ollama => OpenAiConfig::ollama(),
            Backend::Openai => OpenAiConfig::openai(api_key.clone().ok_or_else(missing_key)?),
            Backend::Groq => OpenAiConfig::groq(api_key.clone().ok_or_else(missing_key)?),
            Backend::Custom => {
                let base_url = llm
                    .base_url
                    .clone()
                    .context("custom backend requires [llm] base_url")?;
                OpenAiConfig::ollama()
                    .with_name("custom")
                    .with_base_url(base_url)
            }
        };

        if let Some(ref base_url) = llm.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(key) = api_key
            && config.api_key.is_none()
        {
            config = config.with_api_key(key);
        }
        if let Some(secs) = llm.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config = config
            .with_model(&llm.model)
            .with_max_retries(llm.retry_max);

        debug!(backend = %config.name, base_url = %config.base_url, model = %llm.model, "Building LLM backend");
        Ok(create_shared_backend(config)?)
    }

    pub fn completer(&self, backend: SharedBackend) -> SharedCompleter {
        let llm = self.config.llm();
        Arc::new(
            BackendCompleter::new(backend, llm.model)
                .with_temperature(llm.temperature)
                .with_max_tokens(llm.max_tokens),
        )
    }

    // ── Knowledge ────────────────────────────────────────────────────────

    pub fn embedder(&self) -> Result<SharedEmbedder> {
        let embedding = self.config.embedding();
        let spec = EmbedderSpec {
            provider: embedding.provider.as_str().to_string(),
            model: embedding.model.clone(),
            base_url: embedding.base_url.clone(),
            api_key: embedding.resolve_api_key(),
            dimensions: Some(embedding.effective_dimensions()),
        };
        Ok(build_embedder(&spec)?)
    }

    pub fn database_path(&self) -> PathBuf {
        self.config.memory().database_path(&self.data_dir)
    }

    /// Open the knowledge store sized for `embedder`.
    pub fn open_store(&self, embedder: &SharedEmbedder) -> Result<Arc<KnowledgeStore>> {
        let path = self.database_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let store = KnowledgeStore::open(&path, embedder.dimensions(), embedder.name())
            .with_context(|| format!("failed to open knowledge store at {}", path.display()))?;
        Ok(Arc::new(store))
    }

    pub fn knowledge_base(&self) -> Result<KnowledgeBase> {
        let embedder = self.embedder()?;
        let store = self.open_store(&embedder)?;
        Ok(KnowledgeBase::new(embedder, store)?.with_top_k(self.config.research().top_k))
    }

    pub fn document_reader(&self, dir: Option<PathBuf>) -> DocumentReader {
        let research = self.config.research();
        let dir = dir.unwrap_or_else(|| research.documents_dir());
        DocumentReader::new(dir).with_chunking(research.chunk_size, research.chunk_overlap)
    }

    // ── Search ───────────────────────────────────────────────────────────

    /// Web search for the configured provider.
    ///
    /// A keyed provider without a key falls back to DuckDuckGo.
    pub fn web_search(&self) -> Result<WebSearch> {
        let search = self.config.search();
        let key = search.resolve_api_key();

        let provider = match (search.provider, key) {
            (ConfiguredProvider::DuckDuckGo, _) => SearchProvider::DuckDuckGo,
            (ConfiguredProvider::Brave, Some(api_key)) => SearchProvider::Brave { api_key },
            (ConfiguredProvider::Serper, Some(api_key)) => SearchProvider::Serper { api_key },
            (ConfiguredProvider::Tavily, Some(api_key)) => SearchProvider::Tavily { api_key },
            (other, None) => {
                warn!(
                    provider = other.as_str(),
                    "No API key for search provider, using duckduckgo"
                );
                SearchProvider::DuckDuckGo
            }
        };

        Ok(WebSearch::new(WebSearchConfig {
            provider,
            max_results: search.max_results,
            timeout: Duration::from_secs(search.timeout_secs),
        })?)
    }

    // ── Controller ───────────────────────────────────────────────────────

    pub fn controller_config(&self, overrides: &Overrides) -> ControllerConfig {
        let research = self.config.research();
        let handler_timeout_secs = overrides
            .handler_timeout_secs
            .or(research.handler_timeout_secs);
        ControllerConfig {
            max_iterations: overrides.max_iterations.unwrap_or(research.max_iterations),
            handler_timeout: handler_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Limit for each planning call, enforced by the planner itself.
    pub fn planner_timeout(&self) -> Option<Duration> {
        self.config
            .research()
            .planner_timeout_secs
            .map(Duration::from_secs)
    }

    /// Wire the planner, the three handlers and the synthesizer.
    pub fn controller(&self, overrides: &Overrides) -> Result<ResearchController> {
        let config = self.controller_config(overrides);
        let completer = self.completer(self.backend()?);
        let knowledge = self.knowledge_base()?;
        let reader = self.document_reader(overrides.documents_dir.clone());

        let controller = ResearchController::builder()
            .with_planner(Arc::new(
                Planner::new(completer.clone()).with_timeout(self.planner_timeout()),
            ))
            .with_handler(Arc::new(SearchHandler::new(
                Arc::new(self.web_search()?),
                completer.clone(),
            )))
            .with_handler(Arc::new(RetrieveHandler::new(
                knowledge.clone(),
                completer.clone(),
            )))
            .with_handler(Arc::new(ReadHandler::new(reader, knowledge)))
            .with_synthesizer(Arc::new(AnswerSynthesizer::new(completer)))
            .with_config(config)
            .build()?;
        Ok(controller)
    }

    pub fn archive(&self) -> Result<SessionArchive> {
        let path = self.data_dir.join(ARCHIVE_FILE);
        SessionArchive::open(&path)
            .with_context(|| format!("failed to open session archive at {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(toml: &str) -> App {
        App {
            config: ScoutConfig::from_toml(toml).unwrap(),
            data_dir: PathBuf::from("/tmp/scout-test"),
            config_files: Vec::new(),
        }
    }

    #[test]
    fn test_overrides_win_over_config() {
        let app = app("[research]\nmax_iterations = 4\nhandler_timeout_secs = 30\n");
        let config = app.controller_config(&Overrides {
            max_iterations: Some(2),
            ..Default::default()
        });
        assert_eq!(config.max_iterations, 2);
        assert_eq!(config.handler_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_planner_timeout_from_config() {
        assert_eq!(app("").planner_timeout(), Some(Duration::from_secs(60)));
        let app = app("[research]\nplanner_timeout_secs = 15\n");
        assert_eq!(app.planner_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_database_path_under_data_dir() {
        let app = app("");
        assert_eq!(
            app.database_path(),
            PathBuf::from("/tmp/scout-test/knowledge.db")
        );
    }

    #[test]
    fn test_mock_embedder_from_config() {
        let app = app("[embedding]\nprovider = \"mock\"\ndimensions = 16\n");
        assert_eq!(app.embedder().unwrap().dimensions(), 16);
    }

    #[test]
    fn test_document_reader_override() {
        let app = app("");
        let reader = app.document_reader(Some(PathBuf::from("notes")));
        assert_eq!(reader.data_dir(), Path::new("notes"));
    }
}
