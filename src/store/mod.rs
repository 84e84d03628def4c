//! Durable storage for conversation turns and visitors.
//!
//! The pipeline only ever calls [`TurnStore::save_turn`], fire-and-forget, after a
//! response has been fully delivered. Everything else here backs the plain CRUD
//! endpoints.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::{StoredTurn, Visitor};

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("invalid record: {0}")]
    Invalid(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage for turns, keyed by conversation.
///
/// Implementations must accept concurrent writes for unrelated conversations.
/// Turns of one conversation are returned in insertion order.
#[async_trait]
pub trait TurnStore: Send + Sync {
    async fn save_turn(&self, turn: StoredTurn) -> Result<StoredTurn, PersistenceError>;

    async fn list_turns(&self, conversation_id: &str) -> Result<Vec<StoredTurn>, PersistenceError>;
}

#[derive(Debug, Clone, Default)]
pub struct NewVisitor {
    pub language: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, visitor: NewVisitor) -> Result<Visitor, PersistenceError>;

    async fn get_user(&self, id: &str) -> Result<Option<Visitor>, PersistenceError>;
}
