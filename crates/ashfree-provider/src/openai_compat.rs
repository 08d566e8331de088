//! OpenAI-compatible endpoints (Groq, Ollama, custom).
//!
//! These use the same wire format as OpenAI, just with different base URLs.

use std::time::Duration;

use crate::OpenAiProvider;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Groq API - OpenAI compatible, very fast inference
/// https://console.groq.com/docs/api
pub fn groq(api_key: impl Into<String>, timeout: Duration) -> OpenAiProvider {
    OpenAiProvider::with_timeout(api_key, GROQ_BASE_URL, timeout)
}

/// Ollama with custom base URL
pub fn ollama_with_base(base_url: impl Into<String>, timeout: Duration) -> OpenAiProvider {
    // Ollama ignores the key but the header is still sent
    OpenAiProvider::with_timeout("ollama", base_url, timeout)
}

/// Custom OpenAI-compatible endpoint
pub fn custom(
    api_key: impl Into<String>,
    base_url: impl Into<String>,
    timeout: Duration,
) -> OpenAiProvider {
    OpenAiProvider::with_timeout(api_key, base_url, timeout)
}
