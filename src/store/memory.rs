use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::{NewVisitor, PersistenceError, TurnStore, UserStore};
use crate::conversation::{StoredTurn, Visitor};

const DEFAULT_VISITOR_NAME: &str = "website-visitor";

/// Process-local store. Each conversation keeps its own append-only list.
#[derive(Default)]
pub struct MemoryStore {
    turns: Mutex<HashMap<String, Vec<StoredTurn>>>,
    users: Mutex<HashMap<String, Visitor>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> PersistenceError {
    error!("Failed to lock store mutex: {}", e);
    PersistenceError::Unavailable("store lock poisoned".to_string())
}

#[async_trait]
impl TurnStore for MemoryStore {
    async fn save_turn(&self, turn: StoredTurn) -> Result<StoredTurn, PersistenceError> {
        if turn.conversation_id.trim().is_empty() {
            return Err(PersistenceError::Invalid("conversationId is required".into()));
        }
        if turn.user_id.trim().is_empty() {
            return Err(PersistenceError::Invalid("userId is required".into()));
        }
        if turn.content.is_empty() {
            return Err(PersistenceError::Invalid("text is required".into()));
        }

        let mut turns = self.turns.lock().map_err(poisoned)?;
        turns
            .entry(turn.conversation_id.clone())
            .or_default()
            .push(turn.clone());
        debug!(
            "Stored {} turn {} in conversation {}",
            turn.role.as_str(),
            turn.id,
            turn.conversation_id
        );
        Ok(turn)
    }

    async fn list_turns(&self, conversation_id: &str) -> Result<Vec<StoredTurn>, PersistenceError> {
        let turns = self.turns.lock().map_err(poisoned)?;
        Ok(turns.get(conversation_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, visitor: NewVisitor) -> Result<Visitor, PersistenceError> {
        let language = visitor.language.trim();
        if language.is_empty() {
            return Err(PersistenceError::Invalid("Language is required".into()));
        }

        let user = Visitor {
            id: Uuid::new_v4().simple().to_string(),
            name: visitor
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_VISITOR_NAME.to_string()),
            email: visitor.email.map(|e| e.trim().to_string()).unwrap_or_default(),
            language: language.to_string(),
            created_at: Utc::now(),
        };

        let mut users = self.users.lock().map_err(poisoned)?;
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<Visitor>, PersistenceError> {
        let users = self.users.lock().map_err(poisoned)?;
        Ok(users.get(id).cloned())
    }
}
