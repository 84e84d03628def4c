use anyhow::{Context, Result};
use log::{info, warn};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Value shipped in `.env.example`; treated the same as a missing key.
const PLACEHOLDER_API_KEY: &str = "your_openai_api_key_here";

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OWNER: &str = "Pedro";

const MIN_MAX_TOKENS: usize = 100;
const MAX_MAX_TOKENS: usize = 4096;

/// Settings for the OpenAI-compatible upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Whether replies come from the live capability or from canned text.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationMode {
    Mock,
    Live(LiveSettings),
}

impl GenerationMode {
    pub fn is_mock(&self) -> bool {
        matches!(self, GenerationMode::Mock)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mode: GenerationMode,
    pub owner_name: String,
    pub generation_timeout: Duration,
    pub stream_buffer: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").ok();
        let mode = match api_key.filter(|key| is_usable_key(key)) {
            Some(api_key) => {
                let max_tokens = clamp_max_tokens(parse_var("MAX_TOKENS", 512usize)?);
                GenerationMode::Live(LiveSettings {
                    api_key,
                    base_url: env::var("OPENAI_BASE_URL")
                        .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
                    model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
                    temperature: parse_var("TEMPERATURE", 0.7f32)?,
                    max_tokens,
                })
            }
            None => {
                warn!("OPENAI_API_KEY not set, replies will come from the mock responder");
                GenerationMode::Mock
            }
        };

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", 3001u16)?,
            mode,
            owner_name: env::var("OWNER_NAME").unwrap_or_else(|_| DEFAULT_OWNER.to_string()),
            generation_timeout: Duration::from_secs(parse_var("GENERATION_TIMEOUT_SECS", 30u64)?),
            stream_buffer: parse_var("STREAM_BUFFER", 16usize)?.max(1),
        };
        info!(
            "Configuration loaded: mock={}, timeout={:?}, stream buffer={}",
            config.mode.is_mock(),
            config.generation_timeout,
            config.stream_buffer
        );
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            mode: GenerationMode::Mock,
            owner_name: DEFAULT_OWNER.to_string(),
            generation_timeout: Duration::from_secs(30),
            stream_buffer: 16,
        }
    }
}

fn is_usable_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key != PLACEHOLDER_API_KEY
}

fn clamp_max_tokens(max_tokens: usize) -> usize {
    if max_tokens < MIN_MAX_TOKENS {
        info!("Increasing max_tokens from {} to minimum of {}", max_tokens, MIN_MAX_TOKENS);
        MIN_MAX_TOKENS
    } else if max_tokens > MAX_MAX_TOKENS {
        info!("Capping max_tokens from {} to maximum of {}", max_tokens, MAX_MAX_TOKENS);
        MAX_MAX_TOKENS
    } else {
        max_tokens
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {}: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}
