use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::model::ModelError;
use crate::store::PersistenceError;

/// Failures reported at the request boundary, before any fragment is streamed.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("upstream generation failed: {0}")]
    UpstreamFailure(#[from] ModelError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AgentError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AgentError::InvalidRequest(message.into())
    }
}

impl ResponseError for AgentError {
    fn status_code(&self) -> StatusCode {
        match self {
            AgentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AgentError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            AgentError::NotFound(_) => StatusCode::NOT_FOUND,
            AgentError::Persistence(_) | AgentError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Upstream details stay in the logs; clients only get a generic message.
        let message = match self {
            AgentError::InvalidRequest(_) | AgentError::NotFound(_) => self.to_string(),
            AgentError::UpstreamFailure(_) => "Failed to generate response".to_string(),
            AgentError::Persistence(_) | AgentError::Internal(_) => {
                "Internal server error".to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}
