use crate::names;
use crate::tool::{required_str, Tool, ToolContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const TAVILY_API_BASE: &str = "https://api.tavily.com";

/// Web search backed by the Tavily API
pub struct Search {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl Search {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: TAVILY_API_BASE.to_string(),
        }
    }

    /// Reads TAVILY_API_KEY
    pub fn from_env() -> Result<Self> {
        let key = std::env::var("TAVILY_API_KEY").context("TAVILY_API_KEY is not set")?;
        Ok(Self::new(key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let payload = json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": max_results,
            "search_depth": "advanced",
            "include_answer": false,
        });

        let response = self
            .http_client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to send search request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Tavily API error ({}): {}", status, error_text);
        }

        let body: TavilyResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        let mut results = body.results;
        results.truncate(max_results);
        Ok(results)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[async_trait]
impl Tool for Search {
    fn name(&self) -> &str {
        names::SEARCH
    }

    fn description(&self) -> &str {
        "Query a search engine. Fetches comprehensive, accurate and trusted results; \
         useful for questions about businesses, competitors, industry trends and current events. \
         Provide as much context in the query as needed to ensure high recall."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "The search query" }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let query = required_str(&args, "query")?;
        let results = self.search(query, ctx.max_search_results).await?;
        tracing::info!(query, count = results.len(), "search completed");
        Ok(serde_json::to_string(&results)?)
    }
}
