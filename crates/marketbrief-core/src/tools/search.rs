use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ToolError;
use crate::SecretValue;

pub const DEFAULT_SEARCH_BASE_URL: &str = "https://google.serper.dev";

/// Number of results requested per query.
const SEARCH_RESULT_LIMIT: u32 = 10;

/// One ranked result from the search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Serialize)]
struct SearchQuery<'a> {
    q: &'a str,
    num: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Deserialize)]
struct OrganicResult {
    title: String,
    link: String,
    #[serde(default)]
    snippet: Option<String>,
}

impl From<OrganicResult> for SearchHit {
    fn from(result: OrganicResult) -> Self {
        Self {
            title: result.title,
            url: result.link,
            snippet: result.snippet.unwrap_or_default(),
        }
    }
}

/// Web search backed by the Serper API.
pub struct SearchTool {
    base_url: String,
    api_key: SecretValue,
    http_client: reqwest::Client,
}

impl SearchTool {
    pub fn new(base_url: Option<String>, api_key: SecretValue) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_SEARCH_BASE_URL.to_string()),
            api_key,
            http_client: reqwest::Client::new(),
        }
    }

    pub async fn run(&self, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        let url = format!("{}/search", self.base_url);
        let body = SearchQuery {
            q: query,
            num: SEARCH_RESULT_LIMIT,
        };

        let response = self
            .http_client
            .post(&url)
            .header("X-API-KEY", self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ToolError::Api {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Malformed(e.to_string()))?;

        let hits: Vec<SearchHit> = parsed.organic.into_iter().map(SearchHit::from).collect();
        debug!(query, hits = hits.len(), "search query completed");
        Ok(hits)
    }
}
