use std::sync::Arc;
use std::time::Duration;

use ashfree_provider::{LlmProvider, LlmRequest};

use crate::error::GenerationError;

pub const DEFAULT_MODEL: &str = "llama-3.1-70b-versatile";
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Sampling parameters for one kind of call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationProfile {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationProfile {
    /// Chat and voice replies.
    pub const CONVERSATIONAL: Self = Self {
        max_tokens: 512,
        temperature: 0.7,
    };
    /// Document analysis.
    pub const ANALYTICAL: Self = Self {
        max_tokens: 7000,
        temperature: 0.3,
    };
}

/// Prompt in, one completion out.
#[derive(Clone)]
pub struct GenerationClient {
    provider: Option<Arc<dyn LlmProvider>>,
    model: String,
    timeout: Duration,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider: Some(provider),
            model: model.into(),
            timeout,
        }
    }

    /// Every call fails with `NotConfigured`.
    pub fn unconfigured() -> Self {
        Self {
            provider: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(
        &self,
        prompt: &str,
        profile: GenerationProfile,
    ) -> Result<String, GenerationError> {
        let provider = self.provider.as_ref().ok_or(GenerationError::NotConfigured)?;
        let request = LlmRequest::prompt(&self.model, prompt)
            .with_sampling(profile.max_tokens, profile.temperature);

        tracing::debug!(
            model = %self.model,
            max_tokens = profile.max_tokens,
            prompt_chars = prompt.len(),
            "requesting completion"
        );

        let response = tokio::time::timeout(self.timeout, provider.chat(request))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))?
            .map_err(|error| {
                tracing::debug!(%error, "completion request failed");
                GenerationError::Transport(error.to_string())
            })?;

        tracing::debug!(
            output_tokens = ?response.output_tokens,
            stop_reason = ?response.stop_reason,
            payload = %response.text,
            "completion received"
        );

        if response.text.trim().is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }
        Ok(response.text)
    }
}
