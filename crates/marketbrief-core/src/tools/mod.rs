mod scrape;
mod search;

pub use scrape::ScrapeTool;
pub use search::{DEFAULT_SEARCH_BASE_URL, SearchHit, SearchTool};

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Config;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("http request failed: {0}")]
    Http(String),
    #[error("service error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse service response: {0}")]
    Malformed(String),
    #[error("failed to extract page text: {0}")]
    Extract(String),
}

/// The closed set of tools an agent may be wired with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolRef {
    Search,
    Scrape,
}

impl ToolRef {
    pub fn name(&self) -> &'static str {
        match self {
            ToolRef::Search => "web_search",
            ToolRef::Scrape => "scrape_website",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolRef::Search => "Search the web for recent news, articles, and reports",
            ToolRef::Scrape => "Fetch a web page and extract its readable text",
        }
    }
}

/// Executes tool calls on behalf of the pipeline tasks.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ToolError>;
    async fn scrape(&self, url: &str) -> Result<String, ToolError>;
}

pub type DynToolExecutor = Arc<dyn ToolExecutor>;

/// Live executor backed by the Serper search API and plain HTTP fetches.
pub struct WebToolExecutor {
    search: SearchTool,
    scrape: ScrapeTool,
}

impl WebToolExecutor {
    pub fn new(search: SearchTool, scrape: ScrapeTool) -> Self {
        Self { search, scrape }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            SearchTool::new(None, config.serper_api_key.clone()),
            ScrapeTool::new(),
        )
    }
}

#[async_trait]
impl ToolExecutor for WebToolExecutor {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        self.search.run(query).await
    }

    async fn scrape(&self, url: &str) -> Result<String, ToolError> {
        self.scrape.run(url).await
    }
}

/// Simple in-memory executor for tests and offline runs.
pub struct StubToolExecutor {
    hits: Vec<SearchHit>,
    pages: DashMap<String, String>,
}

impl StubToolExecutor {
    pub fn new() -> Self {
        Self {
            hits: Vec::new(),
            pages: DashMap::new(),
        }
    }

    pub fn with_hit(mut self, hit: SearchHit) -> Self {
        self.hits.push(hit);
        self
    }

    pub fn with_page(self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.pages.insert(url.into(), text.into());
        self
    }
}

impl Default for StubToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for StubToolExecutor {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, ToolError> {
        if self.hits.is_empty() {
            return Ok(vec![SearchHit {
                title: "No indexed results yet; returning placeholder hit.".to_string(),
                url: "stub://search".to_string(),
                snippet: String::new(),
            }]);
        }

        Ok(self.hits.clone())
    }

    async fn scrape(&self, url: &str) -> Result<String, ToolError> {
        Ok(self
            .pages
            .get(url)
            .map(|entry| entry.clone())
            .unwrap_or_else(|| format!("(no stored content for {url})")))
    }
}
