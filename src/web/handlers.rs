use actix_web::error::JsonPayloadError;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;

use crate::agent::detect::LanguageDetector;
use crate::agent::persona::DEFAULT_AGENT;
use crate::agent::Orchestrator;
use crate::conversation::{StoredTurn, Turn};
use crate::error::AgentError;
use crate::store::{NewVisitor, PersistenceError, TurnStore, UserStore};
use crate::web::models::{ChatRequest, CreateUserRequest, DetectRequest, SaveTurnRequest};

// App state structure
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub detector: LanguageDetector,
    pub turns: Arc<dyn TurnStore>,
    pub users: Arc<dyn UserStore>,
}

// Bad records are the caller's fault; anything else is ours
fn storage_error(e: PersistenceError) -> AgentError {
    match e {
        PersistenceError::Invalid(message) => AgentError::InvalidRequest(message),
        other => AgentError::Persistence(other),
    }
}

// Malformed or missing JSON bodies get the same error shape as everything else
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!("Rejected JSON payload for {}: {}", req.path(), err);
    AgentError::invalid(format!("Invalid JSON payload: {}", err)).into()
}

// Health check endpoint
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// Website agent endpoint, streams the reply as server-sent events
pub async fn chat(
    data: web::Data<AppState>,
    req: web::Json<ChatRequest>,
) -> Result<HttpResponse, AgentError> {
    let pending = data.orchestrator.respond(req.into_inner()).await?;

    // The delivery task owns persistence and keeps running on its own.
    drop(pending.delivery);

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header((header::CONNECTION, "keep-alive"))
        .streaming(pending.events))
}

// Language detection endpoint
pub async fn detect_language(
    data: web::Data<AppState>,
    req: web::Json<DetectRequest>,
) -> Result<HttpResponse, AgentError> {
    let detection = data.detector.detect(&req.text).await?;
    Ok(HttpResponse::Ok().json(detection))
}

// Saves a turn originating from the client
pub async fn save_message(
    data: web::Data<AppState>,
    req: web::Json<SaveTurnRequest>,
) -> Result<HttpResponse, AgentError> {
    let req = req.into_inner();
    let mut turn = Turn::new(req.role, req.content);
    if let Some(code) = req.language_code {
        turn = turn.with_language(code);
    }
    let agent = req.agent.unwrap_or_else(|| DEFAULT_AGENT.to_string());

    let saved = data
        .turns
        .save_turn(StoredTurn::new(&turn, req.conversation_id, req.user_id, agent))
        .await
        .map_err(storage_error)?;
    info!(
        "Saved {} message {} to conversation {}",
        saved.role.as_str(),
        saved.id,
        saved.conversation_id
    );
    Ok(HttpResponse::Created().json(saved))
}

pub async fn list_messages(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AgentError> {
    let turns = data.turns.list_turns(&path).await.map_err(storage_error)?;
    Ok(HttpResponse::Ok().json(turns))
}

pub async fn create_user(
    data: web::Data<AppState>,
    req: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, AgentError> {
    let req = req.into_inner();
    let user = data
        .users
        .create_user(NewVisitor {
            language: req.language,
            name: req.name,
            email: req.email,
        })
        .await
        .map_err(storage_error)?;
    info!("Created user {} ({})", user.id, user.language);
    Ok(HttpResponse::Created().json(user))
}

pub async fn get_user(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AgentError> {
    match data.users.get_user(&path).await.map_err(storage_error)? {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Err(AgentError::NotFound("User".to_string())),
    }
}
