use crate::names;
use crate::tool::{required_str, Tool, ToolContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use planner_llm::{ChatClient, ChatRequest, Message};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Page content handed to the model is capped at this many characters
pub const MAX_CONTENT_CHARS: usize = 40_000;

const USER_AGENT: &str = concat!("marketing-planner/", env!("CARGO_PKG_VERSION"));

const INFO_PROMPT: &str = "You are doing web research on behalf of a user. You are trying to find out this information:

<info>
{info}
</info>

You just scraped the following website: {url}

Based on the website content below, jot down some notes about the website.

<Website content>
{content}
</Website content>";

const ANALYSIS_PROMPT: &str = "You've just scraped a business website. Based on the content, analyze and extract:
1. Industry/Niche
2. Products/Services offered
3. Target Audience (if identifiable)
4. Existing Marketing Strategies (social media presence, content marketing, etc.)

Website content:
{content}

Provide a concise analysis of these elements.";

/// Fetches pages and turns HTML into markdown
#[derive(Clone)]
pub struct WebFetcher {
    http_client: reqwest::Client,
}

impl WebFetcher {
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http_client })
    }

    /// GET a page; HTML bodies are converted to markdown, the result is truncated
    pub async fn fetch(&self, raw_url: &str) -> Result<String> {
        let url = normalize_url(raw_url)?;

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Fetching {} failed with status {}", url, response.status());
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(true, |ct| ct.contains("html"));

        let body = response.text().await.context("Failed to read page body")?;

        let content = if is_html {
            match htmd::convert(&body) {
                Ok(markdown) => markdown,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "html conversion failed, using raw body");
                    body
                }
            }
        } else {
            body
        };

        Ok(truncate_chars(&content, MAX_CONTENT_CHARS).to_string())
    }
}

/// Accept bare domains ("acme.com") by assuming https
pub fn normalize_url(raw: &str) -> Result<url::Url> {
    let raw = raw.trim();
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = url::Url::parse(&candidate).with_context(|| format!("Invalid URL: {}", raw))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => anyhow::bail!("Unsupported URL scheme: {}", other),
    }
}

/// Longest prefix of at most `max` characters
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

async fn complete(llm: &dyn ChatClient, model: &str, prompt: String) -> Result<String> {
    let response = llm
        .chat(ChatRequest::new(model, vec![Message::human(prompt)]))
        .await?;
    Ok(response.content.unwrap_or_default())
}

/// Scrape a page and ask the model for notes relevant to the current plan
async fn scrape_notes(
    fetcher: &WebFetcher,
    llm: &dyn ChatClient,
    url: &str,
    ctx: &ToolContext,
) -> Result<String> {
    let content = fetcher.fetch(url).await?;
    let info = serde_json::to_string_pretty(&ctx.marketing_plan)?;

    let prompt = INFO_PROMPT
        .replace("{info}", &info)
        .replace("{url}", url)
        .replace("{content}", &content);

    complete(llm, &ctx.model, prompt).await
}

fn url_parameters(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "url": { "type": "string", "description": description }
        },
        "required": ["url"]
    })
}

/// Scrape and summarize content from a URL, focused on the plan in progress
pub struct ScrapeWebsite {
    fetcher: WebFetcher,
    llm: Arc<dyn ChatClient>,
}

impl ScrapeWebsite {
    pub fn new(fetcher: WebFetcher, llm: Arc<dyn ChatClient>) -> Self {
        Self { fetcher, llm }
    }
}

#[async_trait]
impl Tool for ScrapeWebsite {
    fn name(&self) -> &str {
        names::SCRAPE_WEBSITE
    }

    fn description(&self) -> &str {
        "Scrape a website and get relevant information about the business. \
         Returns notes tailored to the marketing plan being built."
    }

    fn parameters(&self) -> Value {
        url_parameters("The URL to scrape")
    }

    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let url = required_str(&args, "url")?;
        scrape_notes(&self.fetcher, self.llm.as_ref(), url, ctx).await
    }
}

/// Scrape a business site, then extract industry, products, audience and marketing
pub struct AnalyzeWebsite {
    fetcher: WebFetcher,
    llm: Arc<dyn ChatClient>,
}

impl AnalyzeWebsite {
    pub fn new(fetcher: WebFetcher, llm: Arc<dyn ChatClient>) -> Self {
        Self { fetcher, llm }
    }
}

#[async_trait]
impl Tool for AnalyzeWebsite {
    fn name(&self) -> &str {
        names::ANALYZE_WEBSITE
    }

    fn description(&self) -> &str {
        "Analyze a business website to extract marketing-relevant information: \
         industry, products/services, target audience and existing marketing."
    }

    fn parameters(&self) -> Value {
        url_parameters("The business website URL to analyze")
    }

    async fn call(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let url = required_str(&args, "url")?;
        let notes = scrape_notes(&self.fetcher, self.llm.as_ref(), url, ctx).await?;

        let prompt = ANALYSIS_PROMPT.replace("{content}", &notes);
        complete(self.llm.as_ref(), &ctx.model, prompt).await
    }
}
