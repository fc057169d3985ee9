// Configuration layer for provider-agnostic LLM client creation
// Models are addressed as "provider/model", e.g. "anthropic/claude-3-5-sonnet-20240620"

use crate::streaming::ChatStream;
use crate::traits::{ChatClient, ChatRequest, ChatResponse, EmbeddingClient};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type of LLM provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    OpenAI,
    Anthropic,
}

impl ProviderType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "anthropic" => Some(Self::Anthropic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    /// Environment variable holding this provider's API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model reference split into provider and provider-local model name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub provider: ProviderType,
    pub model: String,
}

impl ModelSpec {
    /// Parse "provider/model". A bare model name is treated as OpenAI.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(anyhow!("Model name cannot be empty"));
        }

        match spec.split_once('/') {
            Some((provider, model)) => {
                let provider = ProviderType::parse(provider)
                    .ok_or_else(|| anyhow!("Unsupported model provider: {}", provider))?;
                if model.is_empty() {
                    return Err(anyhow!("Missing model name in '{}'", spec));
                }
                Ok(Self {
                    provider,
                    model: model.to_string(),
                })
            }
            None => Ok(Self {
                provider: ProviderType::OpenAI,
                model: spec.to_string(),
            }),
        }
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Complete provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: ProviderType,
    pub api_key: String,
    /// Override of the provider's default API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            provider: ProviderType::OpenAI,
            api_key: api_key.into(),
            base_url: None,
        }
    }

    pub fn anthropic(api_key: impl Into<String>) -> Self {
        Self {
            provider: ProviderType::Anthropic,
            api_key: api_key.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn provider_type(&self) -> ProviderType {
        self.provider
    }
}

/// Factory for creating LLM clients from configuration
pub struct ClientFactory;

impl ClientFactory {
    /// Create a chat client from provider configuration
    pub fn create_chat_client(config: ProviderConfig) -> Result<Arc<dyn ChatClient>> {
        match config.provider {
            ProviderType::OpenAI => {
                let mut client = crate::openai::OpenAIClient::new(config.api_key)?;
                if let Some(base_url) = config.base_url {
                    client = client.with_base_url(base_url);
                }
                Ok(Arc::new(client))
            }
            ProviderType::Anthropic => {
                let mut client = crate::anthropic::AnthropicClient::new(config.api_key)?;
                if let Some(base_url) = config.base_url {
                    client = client.with_base_url(base_url);
                }
                Ok(Arc::new(client))
            }
        }
    }

    /// Create an embedding client. Only OpenAI serves embeddings.
    pub fn create_embedding_client(config: ProviderConfig) -> Result<Arc<dyn EmbeddingClient>> {
        match config.provider {
            ProviderType::OpenAI => {
                let mut client = crate::openai::OpenAIClient::new(config.api_key)?;
                if let Some(base_url) = config.base_url {
                    client = client.with_base_url(base_url);
                }
                Ok(Arc::new(client))
            }
            ProviderType::Anthropic => Err(anyhow!("Anthropic does not provide an embeddings API")),
        }
    }
}

/// Routes chat requests to the client registered for the model's provider.
///
/// The request's model is rewritten to the bare provider-local name before
/// it is forwarded.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    clients: HashMap<ProviderType, Arc<dyn ChatClient>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: ProviderType, client: Arc<dyn ChatClient>) {
        self.clients.insert(provider, client);
    }

    pub fn with_client(mut self, provider: ProviderType, client: Arc<dyn ChatClient>) -> Self {
        self.register(provider, client);
        self
    }

    /// Build from provider configs
    pub fn from_configs(configs: impl IntoIterator<Item = ProviderConfig>) -> Result<Self> {
        let mut registry = Self::new();
        for config in configs {
            let provider = config.provider;
            registry.register(provider, ClientFactory::create_chat_client(config)?);
        }
        Ok(registry)
    }

    /// Build from OPENAI_API_KEY / ANTHROPIC_API_KEY; at least one must be set
    pub fn from_env() -> Result<Self> {
        let configs: Vec<ProviderConfig> = [ProviderType::OpenAI, ProviderType::Anthropic]
            .into_iter()
            .filter_map(|provider| {
                std::env::var(provider.api_key_var())
                    .ok()
                    .filter(|key| !key.trim().is_empty())
                    .map(|api_key| ProviderConfig {
                        provider,
                        api_key,
                        base_url: None,
                    })
            })
            .collect();

        if configs.is_empty() {
            return Err(anyhow!(
                "No LLM provider configured: set OPENAI_API_KEY or ANTHROPIC_API_KEY"
            ));
        }

        Self::from_configs(configs)
    }

    pub fn providers(&self) -> Vec<ProviderType> {
        let mut providers: Vec<_> = self.clients.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Resolve a "provider/model" string to its client and bare model name
    pub fn resolve(&self, model: &str) -> Result<(Arc<dyn ChatClient>, String)> {
        let spec = ModelSpec::parse(model)?;
        let client = self
            .clients
            .get(&spec.provider)
            .cloned()
            .ok_or_else(|| anyhow!("No client configured for provider '{}'", spec.provider))?;
        Ok((client, spec.model))
    }
}

#[async_trait]
impl ChatClient for ProviderRegistry {
    async fn chat(&self, mut request: ChatRequest) -> Result<ChatResponse> {
        let (client, model) = self.resolve(&request.model)?;
        request.model = model;
        client.chat(request).await
    }

    async fn chat_stream(&self, mut request: ChatRequest) -> Result<ChatStream> {
        let (client, model) = self.resolve(&request.model)?;
        request.model = model;
        client.chat_stream(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_prefixed_model() {
        let spec = ModelSpec::parse("anthropic/claude-3-5-sonnet-20240620").unwrap();
        assert_eq!(spec.provider, ProviderType::Anthropic);
        assert_eq!(spec.model, "claude-3-5-sonnet-20240620");
        assert_eq!(spec.to_string(), "anthropic/claude-3-5-sonnet-20240620");
    }

    #[test]
    fn test_bare_model_defaults_to_openai() {
        let spec = ModelSpec::parse("gpt-4o").unwrap();
        assert_eq!(spec.provider, ProviderType::OpenAI);
        assert_eq!(spec.model, "gpt-4o");
    }

    #[test]
    fn test_invalid_model_specs() {
        assert!(ModelSpec::parse("").is_err());
        assert!(ModelSpec::parse("mistral/large").is_err());
        assert!(ModelSpec::parse("openai/").is_err());
    }

    #[test]
    fn test_provider_config() {
        let config = ProviderConfig::anthropic("key").with_base_url("http://localhost:1234");
        assert_eq!(config.provider_type(), ProviderType::Anthropic);
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:1234"));
    }

    #[test]
    fn test_anthropic_has_no_embeddings() {
        assert!(ClientFactory::create_embedding_client(ProviderConfig::anthropic("key")).is_err());
    }

    #[test]
    fn test_resolve_missing_provider() {
        let registry = ProviderRegistry::from_configs(vec![ProviderConfig::openai("key")]).unwrap();
        assert!(registry.resolve("openai/gpt-4o").is_ok());
        assert!(registry.resolve("anthropic/claude-3-haiku").is_err());
        assert_eq!(registry.providers(), vec![ProviderType::OpenAI]);
    }
}
