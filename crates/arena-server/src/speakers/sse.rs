//! Decoding of OpenAI-style streamed chat completions.
//!
//! The body is a server-sent event stream: `data:` lines carrying JSON chunk
//! objects, blank-line separated, terminated by `data: [DONE]`. Network
//! reads split lines and even UTF-8 sequences arbitrarily, so the decoder
//! buffers raw bytes and only yields complete events.

use std::collections::VecDeque;
use std::fmt::Display;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use orchestration::{Chunk, ChunkStream, SpeakerError};
use serde_json::Value;

/// Data payload marking the end of a completion stream.
pub const DONE_MARKER: &str = "[DONE]";

/// Incremental SSE decoder yielding the `data` payload of each complete event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the payloads of events completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Drain whatever is left once the body has ended.
    pub fn flush(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&rest);
        let rest = rest.trim_end_matches(['\n', '\r']);
        let mut events = Vec::new();
        if !rest.is_empty() {
            if let Some(event) = self.line(rest) {
                events.push(event);
            }
        }
        if let Some(event) = self.dispatch() {
            events.push(event);
        }
        events
    }

    fn line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Comments and fields other than `data` carry nothing for us.
        if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data).join("\n"))
    }
}

/// What one event payload means for the speaker stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    Text(String),
    /// Role preamble, finish marker, or an empty delta.
    Skip,
    Done,
    Malformed(String),
}

/// Interpret one `data:` payload.
pub fn parse_delta(data: &str) -> Delta {
    if data.trim() == DONE_MARKER {
        return Delta::Done;
    }
    let value: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(_) => return Delta::Malformed(data.to_string()),
    };
    let Some(choices) = value.get("choices").and_then(Value::as_array) else {
        return Delta::Malformed(data.to_string());
    };
    match choices
        .first()
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(Value::as_str)
    {
        Some(text) if !text.is_empty() => Delta::Text(text.to_string()),
        _ => Delta::Skip,
    }
}

struct DecodeState<B, E> {
    body: BoxStream<'static, Result<B, E>>,
    decoder: SseDecoder,
    ready: VecDeque<Result<Chunk, SpeakerError>>,
    finished: bool,
}

impl<B, E> DecodeState<B, E> {
    fn accept(&mut self, payloads: Vec<String>) {
        for data in payloads {
            if self.finished {
                return;
            }
            match parse_delta(&data) {
                Delta::Text(text) => self.ready.push_back(Ok(Chunk::Text(text))),
                Delta::Skip => {}
                Delta::Done => self.finished = true,
                Delta::Malformed(raw) => self.ready.push_back(Ok(Chunk::Malformed(raw))),
            }
        }
    }
}

/// Turn a streamed response body into speaker chunks.
pub fn decode_body<S, B, E>(body: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: body.boxed(),
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let payloads = state.decoder.feed(bytes.as_ref());
                    state.accept(payloads);
                }
                Some(Err(err)) => {
                    state
                        .ready
                        .push_back(Err(SpeakerError::StreamBroken(err.to_string())));
                    state.finished = true;
                }
                None => {
                    let payloads = state.decoder.flush();
                    state.accept(payloads);
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn body(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>, String>> + Send + 'static {
        let parts: Vec<Result<Vec<u8>, String>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(parts)
    }

    fn delta(text: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"index\":0,\"delta\":{{\"content\":{}}}}}]}}\n\n",
            serde_json::to_string(text).unwrap()
        )
    }

    #[test]
    fn test_decoder_splits_events() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: one\n\ndata: two\n\n: keepalive\n\n");
        assert_eq!(events, vec!["one", "two"]);
    }

    #[test]
    fn test_decoder_handles_split_reads() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"da").is_empty());
        assert!(decoder.feed(b"ta: hel").is_empty());
        assert!(decoder.feed(b"lo\r\n").is_empty());
        assert_eq!(decoder.feed(b"\r\n"), vec!["hello"]);
    }

    #[test]
    fn test_decoder_split_utf8() {
        let bytes = "data: é\n\n".as_bytes();
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&bytes[..7]).is_empty());
        assert_eq!(decoder.feed(&bytes[7..]), vec!["é"]);
    }

    #[test]
    fn test_flush_without_trailing_blank_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: tail").is_empty());
        assert_eq!(decoder.flush(), vec!["tail"]);
        assert!(decoder.flush().is_empty());
    }

    #[test]
    fn test_parse_delta_shapes() {
        assert_eq!(
            parse_delta(r#"{"choices":[{"delta":{"content":"Use "}}]}"#),
            Delta::Text("Use ".into())
        );
        assert_eq!(
            parse_delta(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#),
            Delta::Skip
        );
        assert_eq!(
            parse_delta(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#),
            Delta::Skip
        );
        assert_eq!(parse_delta("[DONE]"), Delta::Done);
        assert!(matches!(
            parse_delta(r#"{"error":{"message":"rate limited"}}"#),
            Delta::Malformed(_)
        ));
        assert!(matches!(parse_delta("not json"), Delta::Malformed(_)));
    }

    #[tokio::test]
    async fn test_decode_body_yields_text_until_done() {
        let first = delta("Use ");
        let second = delta("flywheels.");
        let after_done = delta("ignored");
        let chunks: Vec<Chunk> = decode_body(body(&[
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            &first[..10],
            &first[10..],
            second.as_str(),
            "data: [DONE]\n\n",
            after_done.as_str(),
        ]))
        .try_collect()
        .await
        .unwrap();
        assert_eq!(
            chunks,
            vec![Chunk::Text("Use ".into()), Chunk::Text("flywheels.".into())]
        );
    }

    #[tokio::test]
    async fn test_decode_body_malformed_chunk() {
        let chunks: Vec<Chunk> = decode_body(body(&["data: {\"object\":\"error\"}\n\n"]))
            .try_collect()
            .await
            .unwrap();
        assert!(matches!(chunks.as_slice(), [Chunk::Malformed(_)]));
    }

    #[tokio::test]
    async fn test_decode_body_transport_error() {
        let parts: Vec<Result<Vec<u8>, String>> = vec![
            Ok(delta("Cost ").into_bytes()),
            Err("connection reset".to_string()),
        ];
        let items: Vec<Result<Chunk, SpeakerError>> =
            decode_body(stream::iter(parts)).collect().await;
        assert_eq!(items[0], Ok(Chunk::Text("Cost ".into())));
        assert_eq!(
            items[1],
            Err(SpeakerError::StreamBroken("connection reset".into()))
        );
        assert_eq!(items.len(), 2);
    }
}
