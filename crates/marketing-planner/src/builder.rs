use std::sync::Arc;

use anyhow::{Context, Result};
use planner_graph::tools::{AskUserInputArgs, ASK_USER_INPUT};
use planner_graph::{Graph, PersistenceContext};
use planner_llm::{ChatClient, ClientFactory, Message, ProviderConfig, ProviderRegistry};
use planner_persist::{InMemoryPersistenceClient, PersistenceClient, ThreadStatus, DEFAULT_MAX_CHECKPOINTS};
use planner_tools::{research_tools, MemoryConfig, MemoryStore, Search, ToolExecutor};
use planner_types::{GraphConfig, MarketingPlan, PlannerInput, PlannerState, RunConfig, StreamEvent};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// High-level builder for a marketing planner
///
/// # Example
///
/// ```rust,no_run
/// use marketing_planner::prelude::*;
///
/// # fn main() -> Result<()> {
/// let planner = PlannerBuilder::new()
///     .openai_key("sk-...")
///     .model("openai/gpt-4o")
///     .max_loops(4)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct PlannerBuilder {
    // LLM
    openai_key: Option<String>,
    anthropic_key: Option<String>,
    llm_client: Option<Arc<dyn ChatClient>>,

    // Tools
    tavily_key: Option<String>,
    tools: Option<ToolExecutor>,
    memory: MemoryConfig,

    persistence: Option<Arc<dyn PersistenceClient>>,
    max_checkpoints: usize,

    run_config: RunConfig,
    graph_config: GraphConfig,
}

impl Default for PlannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerBuilder {
    pub fn new() -> Self {
        Self {
            openai_key: None,
            anthropic_key: None,
            llm_client: None,
            tavily_key: None,
            tools: None,
            memory: MemoryConfig::default(),
            persistence: None,
            max_checkpoints: DEFAULT_MAX_CHECKPOINTS,
            run_config: RunConfig::default(),
            graph_config: GraphConfig::default(),
        }
    }

    /// Set the OpenAI API key (also enables embedding-backed memory search)
    pub fn openai_key(mut self, key: impl Into<String>) -> Self {
        self.openai_key = Some(key.into());
        self
    }

    pub fn anthropic_key(mut self, key: impl Into<String>) -> Self {
        self.anthropic_key = Some(key.into());
        self
    }

    /// Set the Tavily API key; without it the Search tool is not offered
    pub fn tavily_key(mut self, key: impl Into<String>) -> Self {
        self.tavily_key = Some(key.into());
        self
    }

    /// Use this chat client instead of building one from API keys
    pub fn llm_client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.llm_client = Some(client);
        self
    }

    /// Use this tool set instead of the research tools
    pub fn tools(mut self, tools: ToolExecutor) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn memory(mut self, config: MemoryConfig) -> Self {
        self.memory = config;
        self
    }

    /// Store threads here instead of in process memory
    pub fn persistence(mut self, client: Arc<dyn PersistenceClient>) -> Self {
        self.persistence = Some(client);
        self
    }

    /// History kept per thread by the built-in store (default: 100)
    pub fn max_checkpoints(mut self, max: usize) -> Self {
        self.max_checkpoints = max;
        self
    }

    /// Set the model as "provider/model" (default: anthropic/claude-3-5-sonnet-20240620)
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.run_config.model = model.into();
        self
    }

    /// Agent calls allowed before a reviewed plan is final (default: 6)
    pub fn max_loops(mut self, max_loops: u32) -> Self {
        self.run_config.max_loops = max_loops;
        self
    }

    pub fn run_config(mut self, config: RunConfig) -> Self {
        self.run_config = config;
        self
    }

    pub fn graph_config(mut self, config: GraphConfig) -> Self {
        self.graph_config = config;
        self
    }

    /// Build the planner
    ///
    /// # Errors
    ///
    /// Returns an error if no chat client is given and no LLM API key is
    /// available, either from the builder or the environment.
    pub fn build(self) -> Result<Planner> {
        let llm_client = match self.llm_client {
            Some(client) => client,
            None => {
                let mut providers = Vec::new();
                if let Some(key) = &self.openai_key {
                    providers.push(ProviderConfig::openai(key.clone()));
                }
                if let Some(key) = &self.anthropic_key {
                    providers.push(ProviderConfig::anthropic(key.clone()));
                }

                let registry = if providers.is_empty() {
                    ProviderRegistry::from_env()
                        .context("An LLM API key is required. Call .openai_key(key) or .anthropic_key(key)")?
                } else {
                    ProviderRegistry::from_configs(providers)?
                };
                Arc::new(registry) as Arc<dyn ChatClient>
            }
        };

        let tools = match self.tools {
            Some(tools) => tools,
            None => {
                let mut store = MemoryStore::new(self.memory);
                if let Some(key) = self.openai_key {
                    store = store.with_embedder(ClientFactory::create_embedding_client(ProviderConfig::openai(key))?);
                }
                let search = self.tavily_key.map(Search::new);
                research_tools(llm_client.clone(), Arc::new(store), search)?
            }
        };

        let persist = self
            .persistence
            .unwrap_or_else(|| Arc::new(InMemoryPersistenceClient::new().with_max_checkpoints(self.max_checkpoints)));

        let graph = Graph::builder()
            .llm_client(llm_client)
            .tool_executor(Arc::new(tools))
            .config(self.graph_config)
            .with_persistence(persist.clone())
            .build()?;

        Ok(Planner {
            graph: Arc::new(graph),
            persist,
            run_config: self.run_config,
        })
    }
}

/// How a conversation turn ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The planner proposed a plan
    Plan(MarketingPlan),
    /// The planner needs an answer before it can continue
    Question {
        question: String,
        options: Vec<String>,
    },
    /// Plain assistant text
    Reply(String),
}

impl Outcome {
    pub fn from_state(state: &PlannerState) -> Self {
        if state.awaiting_user_input {
            if let Some((_, call)) = state.find_unanswered_call(ASK_USER_INPUT) {
                let args: AskUserInputArgs = call.parse_arguments().unwrap_or_default();
                return Self::Question {
                    question: args.question,
                    options: args.options,
                };
            }
        }

        // a run cut short by max_loops can end on a rejected plan
        let rejected = state.last_review.as_ref().is_some_and(|r| !r.is_satisfactory);

        if let Some(plan) = state.marketing_plan.as_ref().filter(|_| !rejected) {
            match MarketingPlan::from_value(plan) {
                Ok(plan) => return Self::Plan(plan),
                Err(e) => tracing::warn!(error = %e, "plan did not match the expected shape"),
            }
        }

        let text = state
            .messages
            .iter()
            .rev()
            .find(|m| m.is_ai() && !m.text().is_empty())
            .map(Message::text);
        let text = match text {
            Some(text) => text,
            // the reviewer's feedback is the last tool result
            None if rejected => state.last_message().map(Message::text).unwrap_or_default(),
            None => String::new(),
        };
        Self::Reply(text)
    }
}

/// A configured planner ready to hold conversations
pub struct Planner {
    graph: Arc<Graph>,
    persist: Arc<dyn PersistenceClient>,
    run_config: RunConfig,
}

impl Planner {
    /// Create an empty conversation thread
    pub async fn start_thread(&self) -> Result<String> {
        let thread = self.persist.create_thread(None, Default::default()).await?;
        Ok(thread.thread_id)
    }

    /// One-shot conversation in a fresh thread
    pub async fn chat(&self, message: impl AsRef<str>) -> Result<Outcome> {
        let thread_id = self.start_thread().await?;
        self.chat_in_thread(&thread_id, message).await
    }

    /// Continue a thread; an answer to a pending question is just the next message
    pub async fn chat_in_thread(&self, thread_id: &str, message: impl AsRef<str>) -> Result<Outcome> {
        let input = self.claim(thread_id, message.as_ref()).await?;

        let result = self
            .graph
            .run_with_status(input, Some(PersistenceContext::new(thread_id)))
            .await;

        let status = match &result {
            Ok((_, end)) => ThreadStatus::from(*end),
            Err(_) => ThreadStatus::Error,
        };
        self.persist.set_status(thread_id, status).await?;

        let (state, _) = result?;
        Ok(Outcome::from_state(&state))
    }

    /// Continue a thread, streaming graph events as they happen
    pub async fn chat_stream(
        &self,
        thread_id: &str,
        message: impl AsRef<str>,
    ) -> Result<ReceiverStream<StreamEvent>> {
        let input = self.claim(thread_id, message.as_ref()).await?;
        let mut events = self
            .graph
            .spawn_run(input, Some(PersistenceContext::new(thread_id)));

        let (tx, rx) = mpsc::channel(1000);
        let persist = Arc::clone(&self.persist);
        let thread_id = thread_id.to_string();

        tokio::spawn(async move {
            let mut status = ThreadStatus::Error;
            while let Some(event) = events.recv().await {
                if let Some(end) = event.end_status() {
                    status = ThreadStatus::from(end);
                }
                // Keep draining after the receiver is gone so the thread is released
                let _ = tx.send(event).await;
            }
            if let Err(e) = persist.set_status(&thread_id, status).await {
                tracing::warn!(thread_id = %thread_id, error = %e, "failed to release thread");
            }
        });

        Ok(ReceiverStream::new(rx))
    }

    /// Latest state of a thread
    pub async fn state(&self, thread_id: &str) -> Result<Option<PlannerState>> {
        Ok(self
            .persist
            .get_thread(thread_id)
            .await?
            .and_then(|thread| thread.values))
    }

    /// Get the underlying Graph for advanced usage
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn persist(&self) -> &Arc<dyn PersistenceClient> {
        &self.persist
    }

    pub fn run_config(&self) -> &RunConfig {
        &self.run_config
    }

    /// Mark the thread busy and build the run input from its stored state
    async fn claim(&self, thread_id: &str, message: &str) -> Result<PlannerInput> {
        let thread = self.persist.acquire_for_run(thread_id).await?;

        Ok(PlannerInput::new(thread_id, vec![Message::human(message)])
            .with_prior_state(thread.values)
            .with_config(self.run_config.clone()))
    }
}
