use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::persona::{Persona, Prompts};
use crate::conversation::Turn;
use crate::error::AgentError;
use crate::model::{ChatModel, ModelError, TextStream};

/// Produces the canonical-language reply in one bounded, non-streamed call.
pub struct GenerationStage {
    model: Arc<dyn ChatModel>,
    timeout: Duration,
}

impl GenerationStage {
    pub fn new(model: Arc<dyn ChatModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub async fn generate(&self, history: &[Turn]) -> Result<String, ModelError> {
        info!("Generating canonical response over {} turns", history.len());
        let text = timeout(self.timeout, self.model.complete(history))
            .await
            .map_err(|_| ModelError::Timeout)??;
        debug!("Canonical response: {}", text);
        Ok(text)
    }
}

/// Translate-or-refuse: converts a canonical reply into the target language.
///
/// The governing instruction carries the persona's fixed refusal, which the model
/// answers with instead of a translation when the text is out of scope.
#[derive(Clone)]
pub struct TranslationStage {
    model: Arc<dyn ChatModel>,
    prompts: Arc<Prompts>,
}

impl TranslationStage {
    pub fn new(model: Arc<dyn ChatModel>, prompts: Arc<Prompts>) -> Self {
        Self { model, prompts }
    }

    pub async fn translate(
        &self,
        persona: &Persona,
        text: &str,
        language_tag: &str,
    ) -> Result<TextStream, AgentError> {
        info!("Translating response to {} as '{}'", language_tag, persona.id);
        let messages = self
            .prompts
            .translation_messages(persona, text, language_tag)
            .map_err(|e| AgentError::Internal(e.to_string()))?;
        Ok(self.model.complete_streaming(&messages).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedModel;
    use futures_util::StreamExt;

    async fn collect(stream: TextStream) -> Vec<String> {
        stream.map(|chunk| chunk.unwrap()).collect().await
    }

    #[tokio::test]
    async fn generation_times_out() {
        let model = ScriptedModel::replying("late").with_reply_delay(Duration::from_millis(200));
        let stage = GenerationStage::new(Arc::new(model), Duration::from_millis(20));
        assert!(matches!(
            stage.generate(&[Turn::user("hi")]).await,
            Err(ModelError::Timeout)
        ));
    }

    #[tokio::test]
    async fn generation_returns_model_text() {
        let stage = GenerationStage::new(
            Arc::new(ScriptedModel::replying("Pedro writes Rust.")),
            Duration::from_secs(1),
        );
        assert_eq!(stage.generate(&[Turn::user("hi")]).await.unwrap(), "Pedro writes Rust.");
    }

    #[tokio::test]
    async fn in_scope_text_is_streamed_from_model() {
        let model = Arc::new(ScriptedModel::replying("").with_chunks(&[Ok("Pedro "), Ok("escribe Rust.")]));
        let stage = TranslationStage::new(model.clone(), Arc::new(Prompts::new("Pedro").unwrap()));

        let chunks = stage
            .translate(Persona::resolve(None), "Pedro writes Rust.", "es")
            .await
            .unwrap();
        assert_eq!(collect(chunks).await, vec!["Pedro ", "escribe Rust."]);

        let calls = model.translations();
        assert_eq!(calls.len(), 1);
        assert!(calls[0][1].content.ends_with("to Spanish: Pedro writes Rust."));
    }

    #[tokio::test]
    async fn off_topic_text_goes_through_the_governing_instruction() {
        let model = Arc::new(ScriptedModel::replying("").with_chunks(&[Ok("Soy el agente")]));
        let stage = TranslationStage::new(model.clone(), Arc::new(Prompts::new("Pedro").unwrap()));

        stage
            .translate(
                Persona::resolve(None),
                "Photosynthesis works by converting light into energy.",
                "Spanish",
            )
            .await
            .unwrap();
        let calls = model.translations();
        assert_eq!(calls.len(), 1);
        assert!(calls[0][0]
            .content
            .contains("Soy el agente del portafolio profesional de Pedro"));
        assert!(calls[0][1].content.ends_with("Photosynthesis works by converting light into energy."));
    }

    #[tokio::test]
    async fn pleasantries_are_translated_not_refused() {
        let model = Arc::new(ScriptedModel::replying("").with_chunks(&[Ok("¡De nada!")]));
        let stage = TranslationStage::new(model.clone(), Arc::new(Prompts::new("Pedro").unwrap()));

        let chunks = stage
            .translate(
                Persona::resolve(None),
                "You're welcome! Anything else you'd like to know?",
                "es",
            )
            .await
            .unwrap();
        assert_eq!(collect(chunks).await, vec!["¡De nada!"]);
        assert_eq!(model.translations().len(), 1);
    }

    #[tokio::test]
    async fn unknown_language_carries_the_english_refusal() {
        let model = Arc::new(ScriptedModel::replying("").with_chunks(&[Ok("tlhIngan")]));
        let stage = TranslationStage::new(model.clone(), Arc::new(Prompts::new("Pedro").unwrap()));

        stage
            .translate(Persona::resolve(None), "The capital of France is Paris.", "Klingon")
            .await
            .unwrap();
        let calls = model.translations();
        assert_eq!(calls.len(), 1);
        assert!(calls[0][0].content.contains("into Klingon"));
        assert!(calls[0][0].content.contains("I'm Pedro's professional portfolio agent"));
    }
}
