//! Line buffering for the upstream `text/event-stream` body.
//!
//! Network chunks do not line up with event boundaries: one chunk may carry
//! several events, and one event may be split across chunks.

use futures_util::stream::{self, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::mem;
use std::pin::Pin;

use super::{ModelError, TextStream};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Payload of a `data:` line with the prefix stripped.
    Data(String),
    /// The `[DONE]` terminal marker.
    Done,
}

/// Bytes are buffered until a full line arrives, so a character split across
/// chunks is decoded only once both halves are present.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every event completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Parses whatever is left once the body has ended.
    pub fn flush(&mut self) -> Vec<SseEvent> {
        let rest = mem::take(&mut self.buffer);
        parse_line(&String::from_utf8_lossy(&rest)).into_iter().collect()
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    let line = line.trim();
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        Some(SseEvent::Done)
    } else if data.is_empty() {
        None
    } else {
        Some(SseEvent::Data(data.to_string()))
    }
}

/// Content of `choices[0].delta.content`, if the chunk carries any text.
fn delta_content(data: &str) -> Result<Option<String>, ModelError> {
    let chunk: Value = serde_json::from_str(data)
        .map_err(|e| ModelError::MalformedResponse(format!("bad stream chunk: {}", e)))?;
    Ok(chunk
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(|content| content.as_str())
        .filter(|content| !content.is_empty())
        .map(str::to_string))
}

struct DeltaState<S> {
    body: Pin<Box<S>>,
    parser: SseLineBuffer,
    pending: VecDeque<Result<String, ModelError>>,
    finished: bool,
}

impl<S> DeltaState<S> {
    /// Queues text from `events`; returns true once `[DONE]` was seen.
    fn absorb(&mut self, events: Vec<SseEvent>) -> bool {
        for event in events {
            match event {
                SseEvent::Done => return true,
                SseEvent::Data(data) => match delta_content(&data) {
                    Ok(Some(text)) => self.pending.push_back(Ok(text)),
                    Ok(None) => {}
                    Err(e) => {
                        self.pending.push_back(Err(e));
                        return true;
                    }
                },
            }
        }
        false
    }
}

/// Turns an OpenAI-style streamed body into its text deltas.
pub(super) fn delta_stream<S, B, E>(body: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ModelError> + Send + 'static,
{
    let state = DeltaState {
        body: Box::pin(body),
        parser: SseLineBuffer::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let events = state.parser.feed(bytes.as_ref());
                    state.finished = state.absorb(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.pending.push_back(Err(e.into()));
                }
                None => {
                    let events = state.parser.flush();
                    state.absorb(events);
                    state.finished = true;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[test]
    fn events_split_across_chunks_are_reassembled() {
        let mut parser = SseLineBuffer::new();
        assert!(parser.feed(b"data: {\"a\":").is_empty());
        assert_eq!(
            parser.feed(b"1}\n\ndata: [DONE]\n\n"),
            vec![SseEvent::Data("{\"a\":1}".into()), SseEvent::Done]
        );
    }

    #[test]
    fn flush_parses_unterminated_tail() {
        let mut parser = SseLineBuffer::new();
        parser.feed(b": keep-alive\n\ndata: tail");
        assert_eq!(parser.flush(), vec![SseEvent::Data("tail".into())]);
        assert!(parser.flush().is_empty());
    }

    fn chunk(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({ "choices": [{ "delta": { "content": text } }] })
        )
    }

    #[tokio::test]
    async fn delta_stream_yields_text_until_done() {
        let body = format!("{}{}data: [DONE]\n\n{}", chunk("Hola"), chunk(" mundo"), chunk("late"));
        let (first, second) = body.split_at(17);
        let parts: Vec<Result<Vec<u8>, ModelError>> =
            vec![Ok(first.as_bytes().to_vec()), Ok(second.as_bytes().to_vec())];

        let texts: Vec<String> = delta_stream(stream::iter(parts))
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(texts, vec!["Hola", " mundo"]);
    }

    #[tokio::test]
    async fn malformed_chunk_ends_stream_with_error() {
        let parts: Vec<Result<Vec<u8>, ModelError>> = vec![
            Ok(chunk("ok").into_bytes()),
            Ok(b"data: {not json\n\n".to_vec()),
            Ok(chunk("never").into_bytes()),
        ];
        let items: Vec<_> = delta_stream(stream::iter(parts)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "ok");
        assert!(matches!(items[1], Err(ModelError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn characters_split_between_chunks_survive() {
        let body = format!("{}data: [DONE]\n\n", chunk("Año 日本"));
        let bytes = body.into_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let (first, second) = bytes.split_at(split);
        let parts: Vec<Result<Vec<u8>, ModelError>> = vec![Ok(first.to_vec()), Ok(second.to_vec())];

        let texts: Vec<String> = delta_stream(stream::iter(parts))
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(texts, vec!["Año 日本"]);
    }
}
