pub mod openai;
pub mod openai_compat;
pub mod speech;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::OpenAiProvider;
pub use openai_compat::{custom, groq, ollama_with_base};
pub use speech::{AudioStream, ElevenLabsSynthesizer, SpeechSynthesizer, VoiceProfile};
pub use types::*;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse>;
}

// ============================================================
// Provider Configuration
// ============================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    #[default]
    Groq,
    Ollama,
    /// Custom OpenAI-compatible endpoint
    Custom,
    /// Echoes the prompt back; for local runs without credentials.
    Stub,
}

/// Everything needed to build one completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type", default)]
    pub provider_type: ProviderType,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl ProviderConfig {
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_type,
            api_key: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Create a provider from configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let timeout = config.timeout();
    let provider: Arc<dyn LlmProvider> = match config.provider_type {
        ProviderType::OpenAI => {
            let key = config
                .api_key
                .as_ref()
                .ok_or_else(|| anyhow!("openai requires api_key"))?;
            let base_url = config
                .base_url
                .as_deref()
                .unwrap_or(openai_compat::OPENAI_BASE_URL);
            Arc::new(OpenAiProvider::with_timeout(key.clone(), base_url, timeout))
        }
        ProviderType::Groq => {
            let key = config
                .api_key
                .as_ref()
                .ok_or_else(|| anyhow!("groq requires api_key"))?;
            match config.base_url.as_deref() {
                Some(base_url) => Arc::new(custom(key.clone(), base_url, timeout)),
                None => Arc::new(groq(key.clone(), timeout)),
            }
        }
        ProviderType::Ollama => {
            let base_url = config
                .base_url
                .as_deref()
                .unwrap_or(openai_compat::OLLAMA_BASE_URL);
            Arc::new(ollama_with_base(base_url, timeout))
        }
        ProviderType::Custom => {
            let key = config
                .api_key
                .as_ref()
                .ok_or_else(|| anyhow!("custom provider requires api_key"))?;
            let base_url = config
                .base_url
                .as_ref()
                .ok_or_else(|| anyhow!("custom provider requires base_url"))?;
            Arc::new(custom(key.clone(), base_url.clone(), timeout))
        }
        ProviderType::Stub => Arc::new(StubProvider),
    };
    Ok(provider)
}

pub struct StubProvider;

#[async_trait]
impl LlmProvider for StubProvider {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse> {
        let last = request
            .messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let tail: String = last
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or_default()
            .chars()
            .take(120)
            .collect();
        Ok(LlmResponse {
            text: format!("[stub:{}] {}", request.model, tail.trim()),
            input_tokens: None,
            output_tokens: None,
            stop_reason: Some("end_turn".into()),
        })
    }
}
