//! Tavily web search tool: query in, at most `max_results` snippets out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::Tool;

/// Tool name the model sees.
pub const TOOL_TAVILY_SEARCH: &str = "tavily_search_results_json";
/// Default Tavily search endpoint.
pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";
/// Results returned per call unless configured otherwise.
pub const DEFAULT_MAX_RESULTS: usize = 2;
/// Largest `max_results` the search API accepts.
pub const MAX_RESULTS_CEILING: usize = 20;
const SEARCH_DEPTH: &str = "advanced";

/// Body of one Tavily search request.
#[derive(Debug, Serialize)]
struct TavilySearchParams<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
    include_answer: bool,
    include_raw_content: bool,
    include_images: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// One snippet as handed back to the model.
#[derive(Debug, Serialize)]
struct Snippet<'a> {
    title: &'a str,
    url: &'a str,
    content: &'a str,
}

fn format_results(results: &[TavilyResult], max_results: usize) -> Result<String, ToolSourceError> {
    let snippets: Vec<Snippet<'_>> = results
        .iter()
        .take(max_results)
        .map(|r| Snippet {
            title: &r.title,
            url: &r.url,
            content: r.content.trim(),
        })
        .collect();
    serde_json::to_string(&snippets).map_err(|e| ToolSourceError::Transport(e.to_string()))
}

/// Web search via the Tavily API.
///
/// **Interaction**: Registered in a `ToolRegistry`; the turn controller calls it
/// when the model emits a `tavily_search_results_json` tool call.
pub struct TavilySearchTool {
    api_key: String,
    max_results: usize,
    endpoint: String,
    client: reqwest::Client,
}

impl TavilySearchTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            max_results: DEFAULT_MAX_RESULTS,
            endpoint: TAVILY_SEARCH_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Caps the number of results per call (1..=20).
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.clamp(1, MAX_RESULTS_CEILING);
        self
    }

    /// Overrides the search endpoint (proxies, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    async fn search(&self, query: &str) -> Result<Vec<TavilyResult>, ToolSourceError> {
        let params = TavilySearchParams {
            query,
            max_results: self.max_results,
            search_depth: SEARCH_DEPTH,
            include_answer: false,
            include_raw_content: false,
            include_images: false,
        };
        debug!(endpoint = %self.endpoint, query = %query, max_results = self.max_results, "tavily search");
        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&params)
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ToolSourceError::Transport(format!(
                "Tavily API error {}: {}",
                status, body
            )));
        }
        let out: TavilyResponse = res
            .json()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        Ok(out.results)
    }
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn name(&self) -> &str {
        TOOL_TAVILY_SEARCH
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_TAVILY_SEARCH.to_string(),
            description: Some(
                "A search engine optimized for comprehensive, accurate, and trusted results. \
                 Useful for when you need to answer questions about current events. \
                 Input should be a search query."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "search query to look up" }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<ToolCallContent, ToolSourceError> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing query".to_string()))?;
        let results = self.search(query).await?;
        Ok(ToolCallContent {
            text: format_results(&results, self.max_results)?,
        })
    }
}
