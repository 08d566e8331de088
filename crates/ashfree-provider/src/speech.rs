//! Text-to-speech backends.

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;

use crate::openai::ProviderErrorKind;

pub const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
pub const ELEVENLABS_MODEL: &str = "eleven_monolingual_v1";

pub type AudioStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VoiceProfile {
    #[default]
    Default,
    Coach,
    Emergency,
    Calming,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl VoiceProfile {
    pub fn settings(&self) -> VoiceSettings {
        let (stability, similarity_boost, style) = match self {
            Self::Default => (0.5, 0.75, 0.0),
            Self::Coach => (0.7, 0.8, 0.3),
            Self::Emergency => (0.9, 0.9, 0.5),
            Self::Calming => (0.8, 0.7, 0.2),
        };
        VoiceSettings {
            stability,
            similarity_boost,
            style,
            use_speaker_boost: true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Coach => "coach",
            Self::Emergency => "emergency",
            Self::Calming => "calming",
        }
    }
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Full MP3 payload for `text`.
    async fn synthesize(&self, text: &str, voice: VoiceProfile) -> Result<Bytes>;

    async fn stream(&self, text: &str, voice: VoiceProfile) -> Result<AudioStream> {
        let audio = self.synthesize(text, voice).await?;
        Ok(Box::pin(tokio_stream::once(Ok(audio))))
    }
}

#[derive(Debug, Clone)]
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    voices: HashMap<VoiceProfile, String>,
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

impl ElevenLabsSynthesizer {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        voices: HashMap<VoiceProfile, String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            voices,
        }
    }

    /// Profile-specific voice, falling back to the default voice.
    pub fn voice_id(&self, voice: VoiceProfile) -> Result<&str> {
        self.voices
            .get(&voice)
            .or_else(|| self.voices.get(&VoiceProfile::Default))
            .map(String::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow!("no voice id configured for '{}'", voice.as_str()))
    }

    async fn post(&self, text: &str, voice: VoiceProfile, suffix: &str) -> Result<reqwest::Response> {
        let voice_id = self.voice_id(voice)?;
        let url = format!("{}/v1/text-to-speech/{voice_id}{suffix}", self.base_url);
        tracing::debug!(voice = voice.as_str(), chars = text.len(), "requesting speech synthesis");

        let resp = self
            .client
            .post(url)
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&TtsRequest {
                text,
                model_id: ELEVENLABS_MODEL,
                voice_settings: voice.settings(),
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("speech api error (timeout) [retryable]: {e}")
                } else {
                    anyhow!("speech api error: {e}")
                }
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            let retryable = if ProviderErrorKind::from_status(status).is_retryable() {
                " [retryable]"
            } else {
                ""
            };
            return Err(anyhow!("speech api error ({status}){retryable}: {body}"));
        }
        Ok(resp)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, voice: VoiceProfile) -> Result<Bytes> {
        let resp = self.post(text, voice, "").await?;
        let audio = resp.bytes().await?;
        if audio.is_empty() {
            return Err(anyhow!("speech api returned no audio"));
        }
        Ok(audio)
    }

    async fn stream(&self, text: &str, voice: VoiceProfile) -> Result<AudioStream> {
        let resp = self.post(text, voice, "/stream").await?;
        let chunks = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| anyhow!("speech stream error: {e}")));
        Ok(Box::pin(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn synthesizer(base: String) -> ElevenLabsSynthesizer {
        let mut voices = HashMap::new();
        voices.insert(VoiceProfile::Default, "voice-default".to_string());
        voices.insert(VoiceProfile::Calming, "voice-calm".to_string());
        ElevenLabsSynthesizer::new("xi-test", base, voices, Duration::from_secs(5))
    }

    #[test]
    fn emergency_profile_settings() {
        let s = VoiceProfile::Emergency.settings();
        assert_eq!(s.stability, 0.9);
        assert_eq!(s.similarity_boost, 0.9);
        assert_eq!(s.style, 0.5);
        assert!(s.use_speaker_boost);
    }

    #[test]
    fn voice_id_falls_back_to_default() {
        let synth = synthesizer("http://localhost".into());
        assert_eq!(synth.voice_id(VoiceProfile::Calming).unwrap(), "voice-calm");
        assert_eq!(synth.voice_id(VoiceProfile::Coach).unwrap(), "voice-default");
    }

    #[test]
    fn voice_id_missing_everywhere_is_an_error() {
        let synth = ElevenLabsSynthesizer::new(
            "k",
            ELEVENLABS_BASE_URL,
            HashMap::new(),
            Duration::from_secs(1),
        );
        assert!(synth.voice_id(VoiceProfile::Default).is_err());
    }

    #[tokio::test]
    async fn synthesize_returns_audio_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-calm"))
            .and(header("xi-api-key", "xi-test"))
            .and(body_partial_json(serde_json::json!({
                "text": "Breathe in slowly.",
                "model_id": ELEVENLABS_MODEL,
                "voice_settings": {"use_speaker_boost": true}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xFB, 0x90]))
            .expect(1)
            .mount(&server)
            .await;

        let audio = synthesizer(server.uri())
            .synthesize("Breathe in slowly.", VoiceProfile::Calming)
            .await
            .unwrap();
        assert_eq!(audio.as_ref(), &[0xFF, 0xFB, 0x90]);
    }

    #[tokio::test]
    async fn synthesize_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-default"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = synthesizer(server.uri())
            .synthesize("hi", VoiceProfile::Default)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn stream_yields_all_chunks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-default/stream"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 64]))
            .mount(&server)
            .await;

        let mut stream = synthesizer(server.uri())
            .stream("hi", VoiceProfile::Coach)
            .await
            .unwrap();
        let mut total = 0;
        while let Some(chunk) = stream.next().await {
            total += chunk.unwrap().len();
        }
        assert_eq!(total, 64);
    }
}
