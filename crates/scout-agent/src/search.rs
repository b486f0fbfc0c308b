//! Web search backends.
//!
//! Each provider's response (JSON, or HTML for keyless DuckDuckGo) is parsed
//! by a pure function so the parsing is testable without the network.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use crate::error::{AgentError, Result};

/// Default number of results requested from a provider.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// A single search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Anything that can answer a web query with ranked results.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Ranked results for `query`, possibly empty.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

/// Shared search backend.
pub type SharedSearchBackend = Arc<dyn SearchBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Web Search
// ─────────────────────────────────────────────────────────────────────────────

/// Web search provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum SearchProvider {
    /// Brave Search API
    Brave { api_key: String },
    /// Serper (Google Search API)
    Serper { api_key: String },
    /// Tavily Search API
    Tavily { api_key: String },
    /// DuckDuckGo HTML results (no API key needed)
    DuckDuckGo,
}

impl SearchProvider {
    pub fn name(&self) -> &'static str {
        match self {
            SearchProvider::Brave { .. } => "brave",
            SearchProvider::Serper { .. } => "serper",
            SearchProvider::Tavily { .. } => "tavily",
            SearchProvider::DuckDuckGo => "duckduckgo",
        }
    }
}

/// Configuration for web search.
#[derive(Debug, Clone)]
pub struct WebSearchConfig {
    pub provider: SearchProvider,
    /// Maximum number of results to return.
    pub max_results: usize,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProvider::DuckDuckGo,
            max_results: DEFAULT_MAX_RESULTS,
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP search client for the configured provider.
#[derive(Debug, Clone)]
pub struct WebSearch {
    client: Client,
    config: WebSearchConfig,
}

impl WebSearch {
    pub fn new(config: WebSearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("scout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AgentError::config(format!("failed to build HTTP client: {}", e)))?;

        info!(
            provider = config.provider.name(),
            max_results = config.max_results,
            "Web search configured"
        );
        Ok(Self { client, config })
    }

    /// DuckDuckGo with default settings.
    pub fn duckduckgo() -> Result<Self> {
        Self::new(WebSearchConfig::default())
    }

    pub fn config(&self) -> &WebSearchConfig {
        &self.config
    }

    async fn get_json(&self, provider: &str, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| AgentError::search(format!("{} search failed: {}", provider, e)))?;

        if !response.status().is_success() {
            return Err(AgentError::search(format!(
                "{} search error: {}",
                provider,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AgentError::search(format!("Failed to parse {} response: {}", provider, e)))
    }

    async fn search_brave(&self, query: &str, api_key: &str) -> Result<Vec<SearchResult>> {
        let url = format!(
            "https://api.search.brave.com/res/v1/web/search?q={}&count={}",
            urlencoding::encode(query),
            self.config.max_results
        );
        let request = self
            .client
            .get(&url)
            .header("X-Subscription-Token", api_key)
            .header("Accept", "application/json");

        Ok(parse_brave(&self.get_json("Brave", request).await?))
    }

    async fn search_serper(&self, query: &str, api_key: &str) -> Result<Vec<SearchResult>> {
        let request = self
            .client
            .post("https://google.serper.dev/search")
            .header("X-API-KEY", api_key)
            .json(&json!({
                "q": query,
                "num": self.config.max_results
            }));

        Ok(parse_serper(&self.get_json("Serper", request).await?))
    }

    async fn search_tavily(&self, query: &str, api_key: &str) -> Result<Vec<SearchResult>> {
        let request = self.client.post("https://api.tavily.com/search").json(&json!({
            "api_key": api_key,
            "query": query,
            "max_results": self.config.max_results
        }));

        Ok(parse_tavily(&self.get_json("Tavily", request).await?))
    }

    async fn get_text(&self, provider: &str, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| AgentError::search(format!("{} search failed: {}", provider, e)))?;

        if !response.status().is_success() {
            return Err(AgentError::search(format!(
                "{} search error: {}",
                provider,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AgentError::search(format!("Failed to read {} response: {}", provider, e)))
    }

    /// Scrape the HTML results page; fall back to instant answers when the page
    /// yields nothing (bot challenges render without result blocks).
    async fn search_duckduckgo(&self, query: &str) -> Result<Vec<SearchResult>> {
        let url = format!(
            "https://html.duckduckgo.com/html/?q={}",
            urlencoding::encode(query)
        );
        let html = self.get_text("DuckDuckGo", self.client.get(&url)).await?;
        let results = parse_duckduckgo_html(&html, self.config.max_results);
        if !results.is_empty() {
            return Ok(results);
        }

        debug!(query, "No HTML results, trying DuckDuckGo instant answers");
        let url = format!(
            "https://api.duckduckgo.com/?q={}&format=json&no_html=1&skip_disambig=1",
            urlencoding::encode(query)
        );
        let request = self.client.get(&url);

        Ok(parse_duckduckgo(
            &self.get_json("DuckDuckGo", request).await?,
            self.config.max_results,
        ))
    }
}

#[async_trait]
impl SearchBackend for WebSearch {
    fn name(&self) -> &str {
        self.config.provider.name()
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let mut results = match &self.config.provider {
            SearchProvider::Brave { api_key } => self.search_brave(query, api_key).await?,
            SearchProvider::Serper { api_key } => self.search_serper(query, api_key).await?,
            SearchProvider::Tavily { api_key } => self.search_tavily(query, api_key).await?,
            SearchProvider::DuckDuckGo => self.search_duckduckgo(query).await?,
        };
        results.truncate(self.config.max_results);

        debug!(provider = self.name(), query, found = results.len(), "Web search complete");
        Ok(results)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response parsing
// ─────────────────────────────────────────────────────────────────────────────

fn collect_results(items: Option<&Vec<Value>>, url_key: &str, snippet_key: &str) -> Vec<SearchResult> {
    items
        .map(|arr| {
            arr.iter()
                .filter_map(|r| {
                    Some(SearchResult {
                        title: r["title"].as_str()?.to_string(),
                        url: r[url_key].as_str()?.to_string(),
                        snippet: r[snippet_key].as_str().unwrap_or("").to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_brave(data: &Value) -> Vec<SearchResult> {
    collect_results(data["web"]["results"].as_array(), "url", "description")
}

pub fn parse_serper(data: &Value) -> Vec<SearchResult> {
    collect_results(data["organic"].as_array(), "link", "snippet")
}

pub fn parse_tavily(data: &Value) -> Vec<SearchResult> {
    collect_results(data["results"].as_array(), "url", "content")
}

/// DuckDuckGo's instant-answer API: the abstract first, then related topics.
///
/// Grouped topics (`{"Name": ..., "Topics": [...]}`) are flattened in order.
pub fn parse_duckduckgo(data: &Value, max_results: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();

    if let Some(abstract_text) = data["AbstractText"].as_str()
        && !abstract_text.is_empty()
    {
        results.push(SearchResult {
            title: data["Heading"].as_str().unwrap_or("Result").to_string(),
            url: data["AbstractURL"].as_str().unwrap_or("").to_string(),
            snippet: abstract_text.to_string(),
        });
    }

    if let Some(topics) = data["RelatedTopics"].as_array() {
        let limit = max_results.max(results.len());
        collect_topics(topics, limit, &mut results);
    }

    results
}

fn collect_topics(topics: &[Value], limit: usize, results: &mut Vec<SearchResult>) {
    for topic in topics {
        if results.len() >= limit {
            return;
        }
        if let Some(group) = topic["Topics"].as_array() {
            collect_topics(group, limit, results);
        } else if let (Some(text), Some(url)) = (topic["Text"].as_str(), topic["FirstURL"].as_str()) {
            let mut title: String = text.chars().take(50).collect();
            if text.chars().count() > 50 {
                title.push_str("...");
            }
            results.push(SearchResult {
                title,
                url: url.to_string(),
                snippet: text.to_string(),
            });
        }
    }
}

static DDG_RESULT: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("div.result").ok());
static DDG_LINK: LazyLock<Option<Selector>> = LazyLock::new(|| Selector::parse("a.result__a").ok());
static DDG_SNIPPET: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse(".result__snippet").ok());

/// Organic results from DuckDuckGo's HTML endpoint, skipping ads.
pub fn parse_duckduckgo_html(html: &str, max_results: usize) -> Vec<SearchResult> {
    let (Some(result_sel), Some(link_sel), Some(snippet_sel)) =
        (DDG_RESULT.as_ref(), DDG_LINK.as_ref(), DDG_SNIPPET.as_ref())
    else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(result_sel)
        .filter(|block| !block.value().classes().any(|c| c == "result--ad"))
        .filter_map(|block| {
            let link = block.select(link_sel).next()?;
            let url = resolve_duckduckgo_href(link.value().attr("href")?)?;
            let title = collapse_whitespace(&link.text().collect::<String>());
            if title.is_empty() {
                return None;
            }
            let snippet = block
                .select(snippet_sel)
                .next()
                .map(|s| collapse_whitespace(&s.text().collect::<String>()))
                .unwrap_or_default();
            Some(SearchResult {
                title,
                snippet,
                url,
            })
        })
        .take(max_results)
        .collect()
}

/// Result links go through a `/l/?uddg=<target>` redirect; unwrap it.
fn resolve_duckduckgo_href(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{}", href)
    } else {
        href.to_string()
    };
    let parsed = Url::parse(&absolute).ok()?;

    if parsed.domain().is_some_and(|d| d.ends_with("duckduckgo.com"))
        && parsed.path().starts_with("/l/")
    {
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned());
    }
    Some(absolute)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Numbered listing of results for summarization and as a fallback finding.
pub fn format_search_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[{}] {}\n    {}\n    Source: {}\n",
                i + 1,
                r.title,
                r.snippet,
                r.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
