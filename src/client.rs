//! The visitor's side of a conversation.
//!
//! The welcome turn is only written once the visitor actually says something, so
//! abandoned sessions leave nothing behind. It is saved strictly before the first
//! user turn to keep storage order equal to conversation order.

use log::{error, warn};

use crate::agent::stream::DONE_MARKER;
use crate::agent::ChatRequest;
use crate::conversation::{new_conversation_id, StoredTurn, Turn};
use crate::store::{PersistenceError, TurnStore};

pub struct ChatSession {
    conversation_id: String,
    user_id: String,
    language: String,
    agent: String,
    welcome: String,
    turns: Vec<Turn>,
    welcome_saved: bool,
}

impl ChatSession {
    pub fn new(
        user_id: impl Into<String>,
        language: impl Into<String>,
        agent: impl Into<String>,
        welcome: impl Into<String>,
    ) -> Self {
        let mut session = Self {
            conversation_id: String::new(),
            user_id: user_id.into(),
            language: language.into(),
            agent: agent.into(),
            welcome: welcome.into(),
            turns: Vec::new(),
            welcome_saved: false,
        };
        session.reset();
        session
    }

    /// Starts over with a new conversation id and only the welcome turn.
    pub fn reset(&mut self) {
        self.conversation_id = new_conversation_id();
        self.turns = vec![Turn::assistant(self.welcome.clone()).with_language(self.language.clone())];
        self.welcome_saved = false;
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    async fn save(&self, store: &dyn TurnStore, turn: &Turn) -> Result<(), PersistenceError> {
        let record = StoredTurn::new(turn, &self.conversation_id, &self.user_id, &self.agent);
        store.save_turn(record).await.map(|_| ())
    }

    /// Records the visitor's input and returns the request for the agent.
    ///
    /// Persistence failures are logged; the conversation carries on regardless.
    pub async fn send(&mut self, store: &dyn TurnStore, text: &str) -> Option<ChatRequest> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        // Retried on later inputs until it has been stored once.
        if !self.welcome_saved {
            match self.save(store, &self.turns[0]).await {
                Ok(()) => self.welcome_saved = true,
                Err(e) => error!("Failed to save welcome message: {}", e),
            }
        }

        let turn = Turn::user(text).with_language(self.language.clone());
        if let Err(e) = self.save(store, &turn).await {
            error!("Failed to save user message: {}", e);
        }
        self.turns.push(turn);

        Some(ChatRequest {
            messages: Some(
                self.turns
                    .iter()
                    .map(|t| Turn::new(t.role, t.content.clone()))
                    .collect(),
            ),
            language: Some(self.language.clone()),
            agent: Some(self.agent.clone()),
            conversation_id: Some(self.conversation_id.clone()),
            user_id: Some(self.user_id.clone()),
        })
    }

    /// Appends the assistant's reply once its stream has been decoded.
    ///
    /// An incomplete stream shows `error_text` instead, which is also persisted.
    pub async fn finish_reply(
        &mut self,
        store: &dyn TurnStore,
        reply: DecodedReply,
        error_text: &str,
    ) {
        if reply.completed {
            // The server persists completed assistant turns itself.
            self.turns
                .push(Turn::assistant(reply.text).with_language(self.language.clone()));
            return;
        }
        warn!("Assistant reply ended without terminal marker");
        let turn = Turn::assistant(error_text).with_language(self.language.clone());
        if let Err(e) = self.save(store, &turn).await {
            error!("Failed to save error message: {}", e);
        }
        self.turns.push(turn);
    }
}

/// Everything read from one response stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedReply {
    pub text: String,
    pub completed: bool,
}

/// Incremental decoder for the agent's event stream.
///
/// Raw bytes are kept until an event is complete, so multi-byte characters split
/// across network reads decode intact.
#[derive(Debug, Default)]
pub struct EventDecoder {
    buffer: Vec<u8>,
    reply: DecodedReply,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw body bytes; returns the fragments completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut fragments = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let event: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let event = String::from_utf8_lossy(&event[..end]);
            if let Some(fragment) = self.decode(&event) {
                fragments.push(fragment);
            }
        }
        fragments
    }

    fn decode(&mut self, event: &str) -> Option<String> {
        let data = event.strip_prefix("data: ")?;
        if self.reply.completed {
            return None;
        }
        if data == DONE_MARKER {
            self.reply.completed = true;
            return None;
        }
        match serde_json::from_str::<serde_json::Value>(data) {
            Ok(payload) => {
                let content = payload.get("content")?.as_str()?.to_string();
                self.reply.text.push_str(&content);
                Some(content)
            }
            Err(e) => {
                warn!("Error parsing event data: {}", e);
                None
            }
        }
    }

    pub fn finish(self) -> DecodedReply {
        self.reply
    }
}
