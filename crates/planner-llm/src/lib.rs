//! Provider-agnostic chat clients for the planner: message and tool types,
//! OpenAI and Anthropic backends, streaming decode and model routing.

pub mod types;
pub mod traits;
pub mod streaming;
pub mod sse;
pub mod openai;
pub mod anthropic;
pub mod config;

pub use traits::{
    ChatClient,
    EmbeddingClient,
    ChatRequest, ChatResponse, ChatOptions,
    TokenUsage,
};

pub use streaming::{collect_message, StreamEvent, ResponseAccumulator, ChatStream};
pub use sse::{decode_sse_bytes, decode_sse_response, LineBuffer, SseDecoder};
pub use openai::OpenAIClient;
pub use anthropic::AnthropicClient;
pub use config::{ClientFactory, ModelSpec, ProviderConfig, ProviderRegistry, ProviderType};
pub use types::{Message, Content, Tool, ToolCall, ToolChoice};
