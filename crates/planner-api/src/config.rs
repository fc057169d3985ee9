use config::{Config as ConfigLoader, ConfigBuilder, ConfigError, File};
use config::builder::DefaultState;
use planner_llm::{ModelSpec, ProviderType};
use planner_persist::DEFAULT_MAX_CHECKPOINTS;
use planner_tools::MemoryConfig;
use planner_types::{GraphConfig, RunConfig, DEFAULT_MODEL};
use serde::Deserialize;
use std::path::Path;

/// Environment variables that override single keys, e.g. `SERVER_PORT=8080`
const ENV_OVERRIDES: [(&str, &str); 12] = [
    ("SERVER_HOST", "server.host"),
    ("SERVER_PORT", "server.port"),
    ("PLANNER_MODEL", "planner.model"),
    ("PLANNER_MAX_LOOPS", "planner.max_loops"),
    ("PLANNER_MAX_SEARCH_RESULTS", "planner.max_search_results"),
    ("PLANNER_MAX_ITERATIONS", "planner.max_iterations"),
    ("PLANNER_TEMPERATURE", "planner.temperature"),
    ("PLANNER_MAX_TOKENS", "planner.max_tokens"),
    ("MEMORY_NAMESPACE", "memory.namespace"),
    ("PERSIST_MAX_CHECKPOINTS", "persist.max_checkpoints"),
    ("LOG_LEVEL", "logging.level"),
    ("LOG_FORMAT", "logging.format"),
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub persist: PersistConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub tavily_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: vec!["https://agentchat.vercel.app".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub model: String,
    pub max_loops: u32,
    pub max_search_results: usize,
    pub max_iterations: usize,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        let run = RunConfig::default();
        Self {
            model: run.model,
            max_loops: run.max_loops,
            max_search_results: run.max_search_results,
            max_iterations: GraphConfig::default().max_iterations,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl PlannerConfig {
    /// Run defaults; requests may override them through `config.configurable`
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            model: self.model.clone(),
            max_loops: self.max_loops,
            max_search_results: self.max_search_results,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig::default().with_max_iterations(self.max_iterations)
    }
}

/// Model used when the default Anthropic model has no key but OpenAI does
pub const OPENAI_FALLBACK_MODEL: &str = "openai/gpt-4o";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    /// Checkpoints kept per thread for `/threads/{id}/history`
    pub max_checkpoints: usize,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            max_checkpoints: DEFAULT_MAX_CHECKPOINTS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables (SERVER_*, PLANNER_*, MEMORY_*, LOG_*)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false));

        let mut cfg: Config = with_env_overrides(builder)?.build()?.try_deserialize()?;

        // Secrets come from ENV only
        cfg.openai_api_key = secret("OPENAI_API_KEY");
        cfg.anthropic_api_key = secret("ANTHROPIC_API_KEY");
        cfg.tavily_api_key = secret("TAVILY_API_KEY");

        cfg.resolve_model()?;
        Ok(cfg)
    }

    pub fn has_key(&self, provider: ProviderType) -> bool {
        match provider {
            ProviderType::OpenAI => self.openai_api_key.is_some(),
            ProviderType::Anthropic => self.anthropic_api_key.is_some(),
        }
    }

    /// Make sure the configured model can be served by a provider with a key.
    ///
    /// Only the untouched default model falls back to OpenAI; an explicit
    /// choice without its key is an error.
    pub fn resolve_model(&mut self) -> Result<(), ConfigError> {
        if self.openai_api_key.is_none() && self.anthropic_api_key.is_none() {
            return Err(ConfigError::Message(
                "OPENAI_API_KEY or ANTHROPIC_API_KEY environment variable is required".to_string(),
            ));
        }

        let spec = ModelSpec::parse(&self.planner.model)
            .map_err(|e| ConfigError::Message(format!("planner.model: {}", e)))?;
        if self.has_key(spec.provider) {
            return Ok(());
        }

        if self.planner.model == DEFAULT_MODEL && self.has_key(ProviderType::OpenAI) {
            self.planner.model = OPENAI_FALLBACK_MODEL.to_string();
            return Ok(());
        }

        Err(ConfigError::Message(format!(
            "planner.model '{}' needs {} to be set",
            self.planner.model,
            spec.provider.api_key_var()
        )))
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }
}

fn with_env_overrides(
    mut builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    for (var, key) in ENV_OVERRIDES {
        builder = builder.set_override_option(key, std::env::var(var).ok())?;
    }
    Ok(builder)
}

fn secret(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}
