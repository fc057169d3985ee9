//! Server-sent event decoding shared by the provider clients

mod lines;

use anyhow::Result;
use futures::{Stream, StreamExt};

use crate::streaming::{ChatStream, StreamEvent};
pub use lines::LineBuffer;

/// Turns one provider's `data:` payloads into stream events
pub trait SseDecoder: Send {
    fn decode(&self, data: &str) -> Result<Vec<StreamEvent>>;

    /// Payload that closes the stream (OpenAI sends `[DONE]`)
    fn is_end(&self, data: &str) -> bool {
        data == "[DONE]"
    }
}

/// Decode a streaming HTTP response body
pub fn decode_sse_response<D: SseDecoder + Send + 'static>(response: reqwest::Response, decoder: D) -> ChatStream {
    decode_sse_bytes(response.bytes_stream(), decoder)
}

/// Decode SSE from any chunked byte source.
///
/// Only `data:` lines reach the decoder. `event:`, `id:` and comment lines
/// are dropped; both providers repeat the event type inside the JSON.
pub fn decode_sse_bytes<S, B, E, D>(body: S, decoder: D) -> ChatStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
    D: SseDecoder + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut body = Box::pin(body);
        let mut lines = LineBuffer::new();

        while let Some(chunk) = body.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield Err(anyhow::anyhow!("Stream error: {}", e));
                    return;
                }
            };
            lines.push(bytes.as_ref());

            while let Some(line) = lines.next_line() {
                match line.map(|line| data_payload(&line).map(str::to_string)) {
                    Ok(Some(data)) if decoder.is_end(&data) => {
                        yield Ok(StreamEvent::Done { finish_reason: None });
                        return;
                    }
                    Ok(Some(data)) => {
                        for event in decode_line(&decoder, &data) {
                            yield event;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => yield Err(e),
                }
            }
        }

        if let Some(Ok(line)) = lines.finish() {
            if let Some(data) = data_payload(&line).filter(|data| !decoder.is_end(data)) {
                for event in decode_line(&decoder, data) {
                    yield event;
                }
            }
        }
    })
}

fn decode_line<D: SseDecoder>(decoder: &D, data: &str) -> Vec<Result<StreamEvent>> {
    match decoder.decode(data) {
        Ok(events) => events.into_iter().map(Ok).collect(),
        Err(e) => vec![Err(e)],
    }
}

fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl SseDecoder for Echo {
        fn decode(&self, data: &str) -> Result<Vec<StreamEvent>> {
            Ok(vec![StreamEvent::Message {
                content: data.to_string(),
            }])
        }
    }

    fn body(parts: &[&'static str]) -> impl Stream<Item = std::result::Result<&'static [u8], String>> {
        futures::stream::iter(parts.iter().map(|p| Ok(p.as_bytes())).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn test_data_lines_split_across_chunks() {
        let stream = decode_sse_bytes(
            body(&["event: x\ndata: hel", "lo\n\ndata: world\n", "data: [DONE]\ndata: ignored\n"]),
            Echo,
        );
        let events: Vec<_> = stream.collect().await;

        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &StreamEvent::Message { content: "hello".to_string() }
        );
        assert_eq!(
            events[2].as_ref().unwrap(),
            &StreamEvent::Done { finish_reason: None }
        );
    }

    #[tokio::test]
    async fn test_unterminated_last_line_is_decoded() {
        let events: Vec<_> = decode_sse_bytes(body(&["data: tail"]), Echo).collect().await;

        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &StreamEvent::Message { content: "tail".to_string() }
        );
    }

    #[tokio::test]
    async fn test_decoded_stream_runs_on_spawned_task() {
        let stream = decode_sse_bytes(body(&["data: a\n", "data: b\n"]), Echo);
        let events = tokio::spawn(stream.collect::<Vec<_>>()).await.unwrap();

        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let failing = futures::stream::iter(vec![
            Ok::<&'static [u8], String>(b"data: one\n"),
            Err("connection reset".to_string()),
            Ok(b"data: two\n"),
        ]);
        let events: Vec<_> = decode_sse_bytes(failing, Echo).collect().await;

        assert_eq!(events.len(), 2);
        assert!(events[1].as_ref().unwrap_err().to_string().contains("connection reset"));
    }
}
