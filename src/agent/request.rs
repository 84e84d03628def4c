use serde::{Deserialize, Serialize};

use super::persona::DEFAULT_AGENT;
use crate::conversation::{Role, Turn};
use crate::error::AgentError;

/// Body of `POST /api/web-site-agent`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Option<Vec<Turn>>,
    pub language: Option<String>,
    pub agent: Option<String>,
    pub conversation_id: Option<String>,
    pub user_id: Option<String>,
}

/// A validated chat turn, ready for generation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub history: Vec<Turn>,
    pub language: Option<String>,
    pub agent: String,
    pub conversation_id: Option<String>,
    pub user_id: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<ChatRequest> for GenerationRequest {
    type Error = AgentError;

    fn try_from(request: ChatRequest) -> Result<Self, Self::Error> {
        let history = request
            .messages
            .ok_or_else(|| AgentError::invalid("Valid messages array is required"))?;
        if !history.iter().any(|turn| turn.role == Role::User) {
            return Err(AgentError::invalid(
                "Messages must contain at least one user turn",
            ));
        }
        if history
            .iter()
            .any(|turn| turn.role != Role::System && turn.content.trim().is_empty())
        {
            return Err(AgentError::invalid("Message content is required"));
        }
        let user_id =
            non_blank(request.user_id).ok_or_else(|| AgentError::invalid("User ID is required"))?;

        Ok(Self {
            history,
            language: non_blank(request.language),
            agent: non_blank(request.agent).unwrap_or_else(|| DEFAULT_AGENT.to_string()),
            conversation_id: non_blank(request.conversation_id),
            user_id,
        })
    }
}
