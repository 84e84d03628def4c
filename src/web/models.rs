use serde::Deserialize;

use crate::conversation::Role;

pub use crate::agent::ChatRequest;

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    #[serde(default)]
    pub text: String,
}

/// A turn saved by the client itself (welcome, user and error turns).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTurnRequest {
    pub user_id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub language_code: Option<String>,
    pub agent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub language: String,
    pub name: Option<String>,
    pub email: Option<String>,
}
