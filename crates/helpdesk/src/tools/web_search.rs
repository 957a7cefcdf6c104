//! Web search tool
//!
//! Scrapes the DuckDuckGo HTML endpoint. No API key needed, but the markup
//! is not a stable contract; selectors live in one place so breakage is a
//! one-line fix.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::debug;

use chat_core::error::{AgentError, Result};
use chat_core::tool::{Tool, ToolResult, ToolSchema};

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const MAX_RESULTS: usize = 5;
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) support-chat/0.1";

/// A single search hit
#[derive(Clone, Debug, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Searches the web for up-to-date information the catalogs cannot answer.
pub struct WebSearchTool {
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse result anchors and snippets out of the DuckDuckGo HTML page.
///
/// Synchronous on purpose: `scraper::Html` is not `Send`, so it must not be
/// held across an await point.
fn parse_results(html: &str) -> Vec<SearchHit> {
    let document = Html::parse_document(html);

    // Selectors are static; failure here would be a programming error,
    // so fall back to no results rather than panicking.
    let Ok(result_sel) = Selector::parse(".result") else {
        return Vec::new();
    };
    let Ok(title_sel) = Selector::parse(".result__a") else {
        return Vec::new();
    };
    let Ok(snippet_sel) = Selector::parse(".result__snippet") else {
        return Vec::new();
    };

    document
        .select(&result_sel)
        .filter_map(|result| {
            let anchor = result.select(&title_sel).next()?;
            let title = anchor.text().collect::<String>().trim().to_string();
            let url = anchor.value().attr("href")?.to_string();
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(|s| s.text().collect::<String>().trim().to_string())
                .unwrap_or_default();

            if title.is_empty() {
                return None;
            }
            Some(SearchHit { title, url, snippet })
        })
        .take(MAX_RESULTS)
        .collect()
}

#[async_trait]
impl Tool for WebSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "web_search".into(),
            description: "Search the internet for current information that is not in the \
                          product or order catalogs, such as news or general knowledge."
                .into(),
            query_description: "What to search for on the internet".into(),
        }
    }

    async fn execute(&self, query: &str) -> Result<ToolResult> {
        let url = format!("{}?q={}", SEARCH_ENDPOINT, urlencoding::encode(query));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AgentError::ToolExecution(format!("web search request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AgentError::ToolExecution(format!(
                "web search returned HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AgentError::ToolExecution(format!("web search read failed: {e}")))?;

        let hits = parse_results(&body);
        debug!(query, hits = hits.len(), "web search completed");

        let summary = if hits.is_empty() {
            format!("No web results found for '{}'.", query)
        } else {
            format!("Found {} web result(s) for '{}':", hits.len(), query)
        };
        let data = serde_json::to_value(&hits)?;

        Ok(ToolResult::success("web_search", summary).with_data(data))
    }
}
