mod sse;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use futures_util::stream::Stream;
use log::{debug, info};
use reqwest::Client;
use serde_json::{json, Value};
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

use crate::config::LiveSettings;
use crate::conversation::Turn;

pub use sse::{SseEvent, SseLineBuffer};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("timed out waiting for the model")]
    Timeout,
}

/// Incremental text produced by a streaming completion.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ModelError>> + Send>>;

/// The language-generation capability, treated as opaque by the pipeline.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Single non-streamed completion over `messages`.
    async fn complete(&self, messages: &[Turn]) -> Result<String, ModelError>;

    /// Completion delivered as text chunks in generation order.
    async fn complete_streaming(&self, messages: &[Turn]) -> Result<TextStream, ModelError>;
}

const CONNECT_TIMEOUT_SECS: u64 = 10;
// Whole-request bound, streamed translation bodies included.
const REQUEST_TIMEOUT_SECS: u64 = 300;

// A client for OpenAI-compatible chat completion servers
pub struct OpenAiModel {
    settings: LiveSettings,
    client: Client,
}

impl OpenAiModel {
    pub fn new(settings: LiveSettings) -> Result<Self, ModelError> {
        info!(
            "Using chat completion server at: {} (model {})",
            settings.base_url, settings.model
        );
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { settings, client })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn payload(&self, messages: &[Turn], stream: bool) -> Value {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();
        json!({
            "model": self.settings.model,
            "messages": messages,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
            "stream": stream,
        })
    }

    async fn post(&self, payload: &Value) -> Result<reqwest::Response, ModelError> {
        debug!("Payload: {}", payload);
        let response = self
            .client
            .post(self.url())
            .bearer_auth(&self.settings.api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatModel for OpenAiModel {
    async fn complete(&self, messages: &[Turn]) -> Result<String, ModelError> {
        info!(
            "Requesting completion over {} messages (max_tokens: {})",
            messages.len(),
            self.settings.max_tokens
        );
        let response = self.post(&self.payload(messages, false)).await?;

        let response_json: Value = response.json().await?;
        debug!("Response JSON: {}", response_json);

        let content = extract_message_content(&response_json)
            .ok_or_else(|| ModelError::MalformedResponse("missing message content".into()))?;

        info!("Response length: {} characters", content.len());
        Ok(content.to_string())
    }

    async fn complete_streaming(&self, messages: &[Turn]) -> Result<TextStream, ModelError> {
        info!("Requesting streamed completion over {} messages", messages.len());
        let response = self.post(&self.payload(messages, true)).await?;
        Ok(sse::delta_stream(response.bytes_stream()))
    }
}

fn extract_message_content(response: &Value) -> Option<&str> {
    response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> OpenAiModel {
        OpenAiModel::new(LiveSettings {
            api_key: "sk-test".into(),
            base_url: "http://localhost:8081/".into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
            max_tokens: 256,
        })
        .unwrap()
    }

    #[test]
    fn payload_carries_roles_and_stream_flag() {
        let payload = model().payload(&[Turn::system("be nice"), Turn::user("hi")], true);
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "hi");
        assert_eq!(payload["stream"], true);
        assert_eq!(payload["max_tokens"], 256);
    }

    #[test]
    fn url_tolerates_trailing_slash() {
        assert_eq!(model().url(), "http://localhost:8081/v1/chat/completions");
    }

    #[test]
    fn extracts_first_choice_content() {
        let response = json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hello" } }]
        });
        assert_eq!(extract_message_content(&response), Some("Hello"));
        assert_eq!(extract_message_content(&json!({ "choices": [] })), None);
    }
}
