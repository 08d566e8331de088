use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ashfree_provider::{AudioStream, SpeechSynthesizer, VoiceProfile};
use uuid::Uuid;

/// Picks a voice for a conversation style. Unknown styles get the default voice.
pub fn voice_for_style(style: Option<&str>) -> VoiceProfile {
    match style.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("coaching") | Some("coach") => VoiceProfile::Coach,
        Some("emergency") => VoiceProfile::Emergency,
        Some("calming") | Some("calm") => VoiceProfile::Calming,
        _ => VoiceProfile::Default,
    }
}

/// Turns reply text into an audio file the client can fetch.
pub struct SpeechService {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    audio_dir: PathBuf,
    public_prefix: String,
    retention: Option<Duration>,
}

impl SpeechService {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        audio_dir: impl Into<PathBuf>,
        public_prefix: impl Into<String>,
    ) -> Self {
        Self {
            synthesizer,
            audio_dir: audio_dir.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
            retention: None,
        }
    }

    /// Audio files older than `retention` are removed by [`Self::sweep_expired`].
    /// `None` keeps them forever.
    pub fn with_retention(mut self, retention: Option<Duration>) -> Self {
        self.retention = retention;
        self
    }

    pub fn retention(&self) -> Option<Duration> {
        self.retention
    }

    pub fn audio_dir(&self) -> &std::path::Path {
        &self.audio_dir
    }

    /// URL path the audio directory is served under.
    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Synthesizes `text` and returns its public locator, e.g. `/audio/{uuid}.mp3`.
    ///
    /// Failures are logged and yield `None`; a reply never fails because of speech.
    pub async fn render(&self, text: &str, voice: VoiceProfile) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        let audio = match self.synthesizer.synthesize(text, voice).await {
            Ok(audio) => audio,
            Err(error) => {
                tracing::warn!(%error, voice = voice.as_str(), "speech synthesis failed");
                return None;
            }
        };

        let file_name = format!("{}.mp3", Uuid::new_v4());
        let path = self.audio_dir.join(&file_name);
        let written = async {
            tokio::fs::create_dir_all(&self.audio_dir).await?;
            tokio::fs::write(&path, &audio).await
        }
        .await;
        if let Err(error) = written {
            tracing::warn!(%error, path = %path.display(), "failed to store synthesized audio");
            return None;
        }

        tracing::info!(bytes = audio.len(), file = %file_name, "synthesized audio stored");
        Some(format!("{}/{file_name}", self.public_prefix))
    }

    /// Deletes stored clips past the retention age and returns how many went.
    pub async fn sweep_expired(&self) -> usize {
        let Some(retention) = self.retention else {
            return 0;
        };
        let mut entries = match tokio::fs::read_dir(&self.audio_dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(error) => {
                tracing::warn!(%error, dir = %self.audio_dir.display(), "cannot list audio dir");
                return 0;
            }
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("mp3") {
                continue;
            }
            let expired = entry
                .metadata()
                .await
                .and_then(|meta| meta.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age > retention);
            if !expired {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(error) => {
                    tracing::warn!(%error, path = %path.display(), "failed to remove expired audio")
                }
            }
        }
        if removed > 0 {
            tracing::info!(removed, "expired audio swept");
        }
        removed
    }

    pub async fn stream(&self, text: &str, voice: VoiceProfile) -> anyhow::Result<AudioStream> {
        self.synthesizer.stream(text, voice).await
    }
}
