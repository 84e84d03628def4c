use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Language every turn is assumed to be written in unless tagged otherwise.
pub const CANONICAL_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "system")]
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(
        rename = "languageCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub language_tag: Option<String>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            language_tag: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_language(mut self, tag: impl Into<String>) -> Self {
        self.language_tag = Some(tag.into());
        self
    }

    pub fn language(&self) -> &str {
        self.language_tag.as_deref().unwrap_or(CANONICAL_LANGUAGE)
    }
}

/// A turn as recorded by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTurn {
    pub id: Uuid,
    pub conversation_id: String,
    pub user_id: String,
    pub role: Role,
    pub content: String,
    pub language: String,
    pub agent: String,
    pub created_at: DateTime<Utc>,
}

impl StoredTurn {
    pub fn new(
        turn: &Turn,
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        agent: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            role: turn.role,
            content: turn.content.clone(),
            language: turn.language().to_string(),
            agent: agent.into(),
            created_at: Utc::now(),
        }
    }
}

/// A website visitor owning one or more conversations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

/// Fresh opaque conversation identifier: 128 random bits, hex encoded.
pub fn new_conversation_id() -> String {
    Uuid::new_v4().simple().to_string()
}
