//! Language detection, used once when a visitor first writes to the site.

use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::persona::Prompts;
use super::stages::GenerationStage;
use super::Backend;
use crate::conversation::Turn;
use crate::error::AgentError;

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub language: String,
    pub is_mock: bool,
}

// Frequent short words per language; the language with most hits wins.
const MARKERS: &[(&str, &[&str])] = &[
    (
        "English",
        &[
            "hello", "world", "test", "the", "is", "this", "work", "portfolio", "what",
            "are", "you", "your", "and", "skills",
        ],
    ),
    (
        "Spanish",
        &[
            "hola", "mundo", "prueba", "el", "es", "este", "trabajo", "portafolio",
            "gracias", "buenos", "qué", "cuál", "cuáles", "son", "tus", "y",
        ],
    ),
    (
        "French",
        &[
            "bonjour", "monde", "ceci", "est", "un", "le", "merci", "vous", "quelles",
            "sont", "vos", "et",
        ],
    ),
];

fn is_kana(c: char) -> bool {
    matches!(c, '\u{3040}'..='\u{30ff}')
}

/// Word-based guess used when no live model is configured.
pub fn heuristic(text: &str) -> &'static str {
    if text.chars().any(is_kana) {
        return "Japanese";
    }
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let mut best = (UNKNOWN, 0usize);
    for (language, markers) in MARKERS {
        let hits = words.iter().filter(|w| markers.contains(*w)).count();
        if hits > best.1 {
            best = (*language, hits);
        }
    }
    best.0
}

pub struct LanguageDetector {
    backend: Backend,
    prompts: Arc<Prompts>,
    timeout: Duration,
}

impl LanguageDetector {
    pub fn new(backend: Backend, prompts: Arc<Prompts>, timeout: Duration) -> Self {
        Self {
            backend,
            prompts,
            timeout,
        }
    }

    pub async fn detect(&self, text: &str) -> Result<Detection, AgentError> {
        if text.trim().is_empty() {
            return Err(AgentError::invalid("Text input is required"));
        }

        match &self.backend {
            Backend::Mock => {
                let language = heuristic(text);
                info!("Mock language detection: {}", language);
                Ok(Detection {
                    language: language.to_string(),
                    is_mock: true,
                })
            }
            Backend::Live(model) => {
                let prompt = self
                    .prompts
                    .detection_prompt()
                    .map_err(|e| AgentError::Internal(e.to_string()))?;
                let answer = GenerationStage::new(model.clone(), self.timeout)
                    .generate(&[Turn::system(prompt), Turn::user(text)])
                    .await?;
                debug!("Detection answer: {:?}", answer);

                let language = answer.trim().trim_end_matches('.').trim();
                let language = if language.is_empty() { "English" } else { language };
                info!("Detected language: {}", language);
                Ok(Detection {
                    language: language.to_string(),
                    is_mock: false,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedModel;

    #[test]
    fn heuristic_picks_language_with_most_markers() {
        assert_eq!(heuristic("Hello, what are your skills?"), "English");
        assert_eq!(heuristic("¿Cuáles son tus habilidades?"), "Spanish");
        assert_eq!(heuristic("Bonjour, quelles sont vos compétences ?"), "French");
        assert_eq!(heuristic("こんにちは、テストです"), "Japanese");
        assert_eq!(heuristic("12345"), "Unknown");
    }

    fn detector(backend: Backend) -> LanguageDetector {
        LanguageDetector::new(
            backend,
            Arc::new(Prompts::new("Pedro").unwrap()),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn empty_text_is_invalid() {
        assert!(matches!(
            detector(Backend::Mock).detect("  ").await,
            Err(AgentError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn mock_detection_is_flagged() {
        let detection = detector(Backend::Mock).detect("hola mundo").await.unwrap();
        assert_eq!(
            detection,
            Detection {
                language: "Spanish".into(),
                is_mock: true
            }
        );
    }

    #[tokio::test]
    async fn live_detection_uses_model_answer() {
        let model = Arc::new(ScriptedModel::replying(" Portuguese.\n"));
        let detection = detector(Backend::Live(model.clone()))
            .detect("Olá, tudo bem?")
            .await
            .unwrap();
        assert_eq!(detection.language, "Portuguese");
        assert!(!detection.is_mock);

        let call = &model.completions()[0];
        assert!(call[0].content.contains("language detection assistant"));
        assert_eq!(call[1].content, "Olá, tudo bem?");
    }

    #[tokio::test]
    async fn blank_model_answer_means_english() {
        let model = Arc::new(ScriptedModel::replying(""));
        let detection = detector(Backend::Live(model)).detect("???").await.unwrap();
        assert_eq!(detection.language, "English");
    }
}
