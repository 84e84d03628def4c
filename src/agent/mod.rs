//! The agent response pipeline.
//!
//! One chat turn moves through `Validating -> Generating -> Delivering -> Completed`.
//! Failures while validating or generating are returned before any byte is
//! streamed. Once delivery has started the only failure mode is truncation: the
//! channel closes without the `[DONE]` marker and nothing is persisted.

pub mod detect;
pub mod language;
pub mod mock;
pub mod persona;
mod request;
pub mod stages;
pub mod stream;

pub use request::{ChatRequest, GenerationRequest};

use futures_util::StreamExt;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::config::AppConfig;
use crate::conversation::{Role, StoredTurn, Turn, CANONICAL_LANGUAGE};
use crate::error::AgentError;
use crate::model::ChatModel;
use crate::store::TurnStore;
use language::is_canonical;
use persona::{Persona, Prompts};
use stages::{GenerationStage, TranslationStage};
use stream::{EventStream, StreamEmitter};

/// Where replies come from. Fixed for the lifetime of a deployment.
#[derive(Clone)]
pub enum Backend {
    Mock,
    Live(Arc<dyn ChatModel>),
}

impl Backend {
    pub fn is_mock(&self) -> bool {
        matches!(self, Backend::Mock)
    }
}

/// How a response ended once delivery had started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Every fragment and the terminal marker were queued.
    Completed { persisted: bool },
    /// The client went away first.
    Cancelled,
    /// The translation failed mid-stream.
    Truncated,
}

/// A response whose first bytes may already be flowing.
pub struct PendingResponse {
    pub events: EventStream,
    pub delivery: JoinHandle<Delivery>,
}

enum Content {
    Canonical(String),
    Translated {
        text: String,
        language: String,
        translator: TranslationStage,
    },
}

/// Who the assistant turn belongs to, once it is complete.
struct Recipient {
    conversation_id: Option<String>,
    user_id: String,
    agent: String,
    language: String,
}

pub struct Orchestrator {
    backend: Backend,
    prompts: Arc<Prompts>,
    store: Arc<dyn TurnStore>,
    generation_timeout: Duration,
    stream_buffer: usize,
}

impl Orchestrator {
    pub fn new(
        backend: Backend,
        prompts: Arc<Prompts>,
        store: Arc<dyn TurnStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            backend,
            prompts,
            store,
            generation_timeout: config.generation_timeout,
            stream_buffer: config.stream_buffer,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.backend.is_mock()
    }

    /// Validates and generates; on success the returned events stream the reply.
    pub async fn respond(&self, request: ChatRequest) -> Result<PendingResponse, AgentError> {
        let request = GenerationRequest::try_from(request)?;
        let persona = Persona::resolve(Some(&request.agent));
        info!(
            "Agent '{}' request from user {} (conversation {:?}, language {:?})",
            persona.id, request.user_id, request.conversation_id, request.language
        );

        let content = match &self.backend {
            Backend::Mock => {
                info!("Using mock response (no live model configured)");
                Content::Canonical(mock::respond(
                    &request.history,
                    request.language.as_deref(),
                    self.prompts.owner(),
                ))
            }
            Backend::Live(model) => {
                let system_prompt = self
                    .prompts
                    .system_prompt(persona)
                    .map_err(|e| AgentError::Internal(e.to_string()))?;
                let working = with_system_turn(&request.history, system_prompt);
                let initial = GenerationStage::new(model.clone(), self.generation_timeout)
                    .generate(&working)
                    .await
                    .map_err(|e| {
                        error!("Generation failed: {}", e);
                        AgentError::UpstreamFailure(e)
                    })?;

                match request.language.as_deref() {
                    Some(language) if !is_canonical(Some(language)) => Content::Translated {
                        text: initial,
                        language: language.to_string(),
                        translator: TranslationStage::new(model.clone(), self.prompts.clone()),
                    },
                    _ => Content::Canonical(initial),
                }
            }
        };

        let recipient = Recipient {
            conversation_id: request.conversation_id,
            user_id: request.user_id,
            agent: persona.id.to_string(),
            language: request
                .language
                .unwrap_or_else(|| CANONICAL_LANGUAGE.to_string()),
        };
        Ok(self.deliver(content, persona, recipient))
    }

    fn deliver(
        &self,
        content: Content,
        persona: &'static Persona,
        recipient: Recipient,
    ) -> PendingResponse {
        let (emitter, events) = stream::channel(self.stream_buffer);
        let store = self.store.clone();
        let chunk_timeout = self.generation_timeout;

        let delivery = tokio::spawn(async move {
            let mut emitter = emitter;
            let text = match content {
                Content::Canonical(text) => emit_text(&mut emitter, text).await,
                Content::Translated {
                    text,
                    language,
                    translator,
                } => {
                    stream_translation(
                        &mut emitter,
                        &translator,
                        persona,
                        &text,
                        &language,
                        chunk_timeout,
                    )
                    .await
                }
            };
            let text = match text {
                Ok(text) => text,
                Err(outcome) => return outcome,
            };

            if emitter.close().await.is_err() {
                info!("Client disconnected before the end of the response");
                return Delivery::Cancelled;
            }
            debug!("Response delivered in {} fragments", emitter.emitted());

            let persisted = persist(store.as_ref(), recipient, text).await;
            Delivery::Completed { persisted }
        });

        PendingResponse { events, delivery }
    }
}

/// Working copy of `history` with the persona instruction at position 0.
fn with_system_turn(history: &[Turn], system_prompt: String) -> Vec<Turn> {
    if history.iter().any(|turn| turn.role == Role::System) {
        return history.to_vec();
    }
    let mut working = Vec::with_capacity(history.len() + 1);
    working.push(Turn::system(system_prompt));
    working.extend_from_slice(history);
    working
}

async fn emit_text(emitter: &mut StreamEmitter, text: String) -> Result<String, Delivery> {
    for fragment in stream::fragments(&text) {
        if emitter.emit(fragment).await.is_err() {
            info!("Client disconnected after {} fragments", emitter.emitted());
            return Err(Delivery::Cancelled);
        }
    }
    Ok(text)
}

async fn stream_translation(
    emitter: &mut StreamEmitter,
    translator: &TranslationStage,
    persona: &Persona,
    text: &str,
    language: &str,
    chunk_timeout: Duration,
) -> Result<String, Delivery> {
    let started = tokio::select! {
        _ = emitter.disconnected() => return Err(Delivery::Cancelled),
        started = timeout(chunk_timeout, translator.translate(persona, text, language)) => started,
    };
    let mut chunks = match started {
        Ok(Ok(chunks)) => chunks,
        Ok(Err(e)) => {
            warn!("Translation to {} failed to start: {}", language, e);
            return Err(Delivery::Truncated);
        }
        Err(_) => {
            warn!("Translation to {} did not start within {:?}", language, chunk_timeout);
            return Err(Delivery::Truncated);
        }
    };

    let mut translated = String::new();
    loop {
        let next = tokio::select! {
            _ = emitter.disconnected() => {
                info!("Client disconnected during translation, stopping upstream");
                return Err(Delivery::Cancelled);
            }
            next = timeout(chunk_timeout, chunks.next()) => next,
        };
        match next {
            Ok(Some(Ok(chunk))) => {
                if chunk.is_empty() {
                    continue;
                }
                if emitter.emit(&chunk).await.is_err() {
                    info!("Client disconnected after {} fragments", emitter.emitted());
                    return Err(Delivery::Cancelled);
                }
                translated.push_str(&chunk);
            }
            Ok(None) => return Ok(translated),
            Ok(Some(Err(e))) => {
                warn!("Translation to {} failed mid-stream: {}", language, e);
                return Err(Delivery::Truncated);
            }
            Err(_) => {
                warn!("Translation to {} stalled for {:?}", language, chunk_timeout);
                return Err(Delivery::Truncated);
            }
        }
    }
}

async fn persist(store: &dyn TurnStore, recipient: Recipient, text: String) -> bool {
    let Some(conversation_id) = recipient.conversation_id else {
        debug!("No conversation id, assistant turn not persisted");
        return false;
    };
    let turn = Turn::assistant(text).with_language(recipient.language);
    let record = StoredTurn::new(&turn, conversation_id, recipient.user_id, recipient.agent);
    match store.save_turn(record).await {
        Ok(saved) => {
            info!("Assistant message {} saved to conversation {}", saved.id, saved.conversation_id);
            true
        }
        Err(e) => {
            error!("Error saving assistant message: {}", e);
            false
        }
    }
}
