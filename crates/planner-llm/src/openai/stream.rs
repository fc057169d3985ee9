use anyhow::{Context, Result};
use serde::Deserialize;

use crate::sse::SseDecoder;
use crate::streaming::StreamEvent;

/// One `chat.completion.chunk`. Only the first choice is read since the
/// planner never asks for `n > 1`. Usage-only chunks carry no choices.
#[derive(Debug, Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<CallFragment>,
}

#[derive(Debug, Deserialize)]
struct CallFragment {
    index: u32,
    id: Option<String>,
    #[serde(default)]
    function: FunctionFragment,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionFragment {
    name: Option<String>,
    arguments: Option<String>,
}

impl Chunk {
    fn into_events(self) -> Vec<StreamEvent> {
        let Some(choice) = self.choices.into_iter().next() else {
            return Vec::new();
        };

        let text = choice
            .delta
            .content
            .filter(|content| !content.is_empty())
            .map(|content| StreamEvent::Message { content });

        let calls = choice.delta.tool_calls.into_iter().map(|call| StreamEvent::ToolCall {
            index: call.index,
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        });

        let done = choice
            .finish_reason
            .map(|reason| StreamEvent::Done { finish_reason: Some(reason) });

        text.into_iter().chain(calls).chain(done).collect()
    }
}

/// Chat Completions chunk decoder
pub struct OpenAIChatParser;

impl SseDecoder for OpenAIChatParser {
    fn decode(&self, data: &str) -> Result<Vec<StreamEvent>> {
        let chunk: Chunk = serde_json::from_str(data).context("Failed to parse chat chunk")?;
        Ok(chunk.into_events())
    }
}
