mod client;
mod stream;

pub use client::AnthropicClient;
pub use stream::AnthropicStreamParser;
