use std::sync::Arc;

use anyhow::Result;
use planner_graph::Graph;
use planner_llm::{ChatClient, ClientFactory, ProviderConfig, ProviderRegistry};
use planner_persist::{InMemoryPersistenceClient, PersistenceClient};
use planner_tools::{research_tools, MemoryStore, Search, ToolExecutor};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

pub fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

/// Chat clients for every provider with a key
pub fn build_llm_client(config: &Config) -> Result<Arc<dyn ChatClient>> {
    let mut providers = Vec::new();
    if let Some(key) = &config.openai_api_key {
        providers.push(ProviderConfig::openai(key.clone()));
    }
    if let Some(key) = &config.anthropic_api_key {
        providers.push(ProviderConfig::anthropic(key.clone()));
    }

    let registry = if providers.is_empty() {
        ProviderRegistry::from_env()?
    } else {
        ProviderRegistry::from_configs(providers)?
    };

    tracing::info!(providers = ?registry.providers(), "LLM providers configured");
    Ok(Arc::new(registry))
}

/// Research tools; Search is only offered when a Tavily key is configured
pub fn build_tools(config: &Config, llm_client: Arc<dyn ChatClient>) -> Result<ToolExecutor> {
    let mut store = MemoryStore::new(config.memory.clone());
    match &config.openai_api_key {
        Some(key) => {
            store = store.with_embedder(ClientFactory::create_embedding_client(ProviderConfig::openai(key.clone()))?);
        }
        None => tracing::warn!("OPENAI_API_KEY not set, memory search falls back to keyword ranking"),
    }

    let search = config.tavily_api_key.clone().map(Search::new);
    let executor = research_tools(llm_client, Arc::new(store), search)?;

    tracing::info!(tools = ?executor.list_tools(), "tools registered");
    Ok(executor)
}

/// Thread store with the configured history cap
pub fn build_persistence(config: &Config) -> Arc<dyn PersistenceClient> {
    Arc::new(InMemoryPersistenceClient::new().with_max_checkpoints(config.persist.max_checkpoints))
}

pub fn build_graph(config: &Config, persist: Arc<dyn PersistenceClient>) -> Result<Graph> {
    let llm_client = build_llm_client(config)?;
    let executor = build_tools(config, llm_client.clone())?;

    Graph::builder()
        .llm_client(llm_client)
        .tool_executor(Arc::new(executor))
        .config(config.planner.graph_config())
        .with_persistence(persist)
        .build()
}
