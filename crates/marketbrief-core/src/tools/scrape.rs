use htmd::HtmlToMarkdown;
use tracing::debug;

use super::ToolError;

/// Upper bound on extracted page text, in characters. Keeps a single noisy
/// page from dominating the analyst prompt.
const PAGE_TEXT_CHAR_LIMIT: usize = 12_000;

/// Fetches a page over HTTP and reduces it to readable Markdown text.
pub struct ScrapeTool {
    http_client: reqwest::Client,
}

impl ScrapeTool {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }

    pub async fn run(&self, url: &str) -> Result<String, ToolError> {
        let response = self
            .http_client
            .get(url)
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

        let html = response
            .text()
            .await
            .map_err(|e| ToolError::Http(e.to_string()))?;

        let text = extract_page_text(&html)?;
        debug!(url, chars = text.len(), "page scraped");
        Ok(text)
    }
}

impl Default for ScrapeTool {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_page_text(html: &str) -> Result<String, ToolError> {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "footer"])
        .build();
    let text = converter
        .convert(html)
        .map_err(|e| ToolError::Extract(e.to_string()))?;
    Ok(truncate_chars(text.trim(), PAGE_TEXT_CHAR_LIMIT).to_string())
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
