//! Scripted stand-in for the generation capability.

use async_trait::async_trait;
use futures_util::stream;
use std::sync::Mutex;
use std::time::Duration;

use super::{ChatModel, ModelError, TextStream};
use crate::conversation::Turn;

pub(crate) struct ScriptedModel {
    reply: Mutex<Option<Result<String, ModelError>>>,
    chunks: Vec<Result<String, String>>,
    reply_delay: Option<Duration>,
    stream_delay: Option<Duration>,
    completions: Mutex<Vec<Vec<Turn>>>,
    translations: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedModel {
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            reply: Mutex::new(Some(Ok(reply.to_string()))),
            chunks: Vec::new(),
            reply_delay: None,
            stream_delay: None,
            completions: Mutex::new(Vec::new()),
            translations: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(error: ModelError) -> Self {
        let model = Self::replying("");
        *model.reply.lock().unwrap() = Some(Err(error));
        model
    }

    /// Chunks streamed by `complete_streaming`; `Err` entries fail mid-stream.
    pub(crate) fn with_chunks(mut self, chunks: &[Result<&str, &str>]) -> Self {
        self.chunks = chunks
            .iter()
            .map(|c| c.map(str::to_string).map_err(str::to_string))
            .collect();
        self
    }

    pub(crate) fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = Some(delay);
        self
    }

    /// Delay before `complete_streaming` hands back its stream.
    pub(crate) fn with_stream_delay(mut self, delay: Duration) -> Self {
        self.stream_delay = Some(delay);
        self
    }

    pub(crate) fn completions(&self) -> Vec<Vec<Turn>> {
        self.completions.lock().unwrap().clone()
    }

    pub(crate) fn translations(&self) -> Vec<Vec<Turn>> {
        self.translations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: &[Turn]) -> Result<String, ModelError> {
        self.completions.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.reply_delay {
            tokio::time::sleep(delay).await;
        }
        let mut reply = self.reply.lock().unwrap();
        match reply.as_ref() {
            Some(Ok(text)) => Ok(text.clone()),
            _ => Err(reply.take().and_then(Result::err).unwrap_or(ModelError::Timeout)),
        }
    }

    async fn complete_streaming(&self, messages: &[Turn]) -> Result<TextStream, ModelError> {
        self.translations.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.stream_delay {
            tokio::time::sleep(delay).await;
        }
        let items: Vec<Result<String, ModelError>> = self
            .chunks
            .iter()
            .map(|c| c.clone().map_err(ModelError::MalformedResponse))
            .collect();
        let stream: TextStream = Box::pin(stream::iter(items));
        Ok(stream)
    }
}
