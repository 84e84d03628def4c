//! Server-sent event framing for one response.
//!
//! Each fragment becomes `data: {"content": ...}\n\n`; the response ends with
//! `data: [DONE]\n\n`. The queue between the emitter and the transport is bounded,
//! so a slow client pauses production instead of growing memory.

use actix_web::web::Bytes;
use futures_util::stream::Stream;
use log::debug;
use serde::Serialize;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

pub const DONE_MARKER: &str = "[DONE]";

#[derive(Serialize)]
struct FragmentEvent<'a> {
    content: &'a str,
}

pub fn encode_fragment(fragment: &str) -> Bytes {
    // Serializing a struct of one &str cannot fail.
    let payload = serde_json::to_string(&FragmentEvent { content: fragment })
        .unwrap_or_else(|_| String::from("{\"content\":\"\"}"));
    Bytes::from(format!("data: {}\n\n", payload))
}

pub fn encode_done() -> Bytes {
    Bytes::from(format!("data: {}\n\n", DONE_MARKER))
}

/// The client went away; nothing more can be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

/// Append-only sink for one response. Single producer, FIFO.
pub struct StreamEmitter {
    tx: Option<mpsc::Sender<Bytes>>,
    emitted: usize,
}

/// Transport side of a [`StreamEmitter`], suitable for a streaming response body.
pub struct EventStream {
    rx: mpsc::Receiver<Bytes>,
}

pub fn channel(capacity: usize) -> (StreamEmitter, EventStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        StreamEmitter {
            tx: Some(tx),
            emitted: 0,
        },
        EventStream { rx },
    )
}

impl StreamEmitter {
    /// Queues one fragment, waiting while the transport is saturated.
    ///
    /// After [`close`](Self::close) this is a no-op.
    pub async fn emit(&mut self, fragment: &str) -> Result<(), Disconnected> {
        let Some(tx) = self.tx.as_ref() else {
            debug!("Dropping fragment emitted after close");
            return Ok(());
        };
        tx.send(encode_fragment(fragment))
            .await
            .map_err(|_| Disconnected)?;
        self.emitted += 1;
        Ok(())
    }

    /// Sends the terminal marker and releases the channel.
    pub async fn close(&mut self) -> Result<(), Disconnected> {
        match self.tx.take() {
            Some(tx) => tx.send(encode_done()).await.map_err(|_| Disconnected),
            None => Ok(()),
        }
    }

    /// Resolves once the client side has gone away.
    pub async fn disconnected(&self) {
        match self.tx.as_ref() {
            Some(tx) => tx.closed().await,
            None => std::future::pending().await,
        }
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl Stream for EventStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx).map(|event| event.map(Ok))
    }
}

/// Splits text into word-sized pieces whose concatenation is the original text.
pub fn fragments(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(char::is_whitespace)
}
