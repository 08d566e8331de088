use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

impl LlmMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<LlmMessage>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.7
}

impl LlmRequest {
    /// A single user-role message carrying the whole prompt.
    pub fn prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            messages: vec![LlmMessage::user(prompt)],
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub stop_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_request_wraps_text_as_single_user_message() {
        let req = LlmRequest::prompt("llama", "hello there");
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, "user");
        assert_eq!(req.messages[0].content, "hello there");
        assert!(req.system.is_none());
    }

    #[test]
    fn with_sampling_overrides_defaults() {
        let req = LlmRequest::prompt("m", "p").with_sampling(7000, 0.3);
        assert_eq!(req.max_tokens, 7000);
        assert!((req.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn request_deserialization_fills_defaults() {
        let req: LlmRequest = serde_json::from_value(serde_json::json!({
            "model": "m",
            "system": null,
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();
        assert_eq!(req.max_tokens, 512);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn assistant_constructor() {
        let msg = LlmMessage::assistant("reply");
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.content, "reply");
    }
}
