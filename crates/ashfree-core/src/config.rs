use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use ashfree_provider::speech::ELEVENLABS_BASE_URL;
use ashfree_provider::{
    create_provider, ElevenLabsSynthesizer, ProviderConfig, ProviderType, VoiceProfile,
};
use serde::{Deserialize, Serialize};

use crate::generation::{GenerationClient, DEFAULT_MODEL};
use crate::retriever::DEFAULT_RETRIEVAL_K;
use crate::speech::SpeechService;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AshfreeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: GenerationConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub cravings: CravingsConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub users: UsersConfig,
    #[serde(default)]
    pub calm: CalmConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(rename = "type", default)]
    pub provider_type: ProviderType,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::default(),
            base_url: None,
            model: default_model(),
            api_key_env: default_llm_key_env(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_llm_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_knowledge_path")]
    pub path: PathBuf,
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: default_knowledge_path(),
            retrieval_k: default_retrieval_k(),
        }
    }
}

fn default_knowledge_path() -> PathBuf {
    PathBuf::from("data/knowledge_base/knowledge_base.json")
}

fn default_retrieval_k() -> usize {
    DEFAULT_RETRIEVAL_K
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// `None` keeps conversations in memory only.
    #[serde(default = "default_conversation_dir")]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            dir: default_conversation_dir(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_conversation_dir() -> Option<PathBuf> {
    Some(PathBuf::from("data/conversations"))
}

fn default_history_limit() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CravingsConfig {
    #[serde(default = "default_cravings_dir")]
    pub dir: PathBuf,
}

impl Default for CravingsConfig {
    fn default() -> Self {
        Self {
            dir: default_cravings_dir(),
        }
    }
}

fn default_cravings_dir() -> PathBuf {
    PathBuf::from("data/users")
}

/// Profiles and quit plans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersConfig {
    #[serde(default = "default_cravings_dir")]
    pub dir: PathBuf,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            dir: default_cravings_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalmConfig {
    /// JSONL journal of calm sessions; null disables it.
    #[serde(default = "default_calm_log")]
    pub log_path: Option<PathBuf>,
}

impl Default for CalmConfig {
    fn default() -> Self {
        Self {
            log_path: default_calm_log(),
        }
    }
}

fn default_calm_log() -> Option<PathBuf> {
    Some(PathBuf::from("data/logs/calm_interactions.jsonl"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_pack_cost")]
    pub pack_cost: f64,
    #[serde(default = "default_packs_per_day")]
    pub packs_per_day: f64,
    #[serde(default = "default_goal_days")]
    pub goal_days: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            pack_cost: default_pack_cost(),
            packs_per_day: default_packs_per_day(),
            goal_days: default_goal_days(),
        }
    }
}

fn default_pack_cost() -> f64 {
    8.0
}

fn default_packs_per_day() -> f64 {
    1.0
}

fn default_goal_days() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_speech_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_speech_base_url")]
    pub base_url: String,
    /// Voice id per profile; `default` is the fallback for the others.
    #[serde(default)]
    pub voices: HashMap<VoiceProfile, String>,
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
    #[serde(default = "default_speech_timeout_secs")]
    pub timeout_secs: u64,
    /// Stored clips older than this are swept; 0 keeps them forever.
    #[serde(default = "default_audio_retention_hours")]
    pub audio_retention_hours: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key_env: default_speech_key_env(),
            base_url: default_speech_base_url(),
            voices: HashMap::new(),
            audio_dir: default_audio_dir(),
            public_prefix: default_public_prefix(),
            timeout_secs: default_speech_timeout_secs(),
            audio_retention_hours: default_audio_retention_hours(),
        }
    }
}

fn default_speech_key_env() -> String {
    "ELEVENLABS_API_KEY".to_string()
}

fn default_speech_base_url() -> String {
    ELEVENLABS_BASE_URL.to_string()
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("static/audio")
}

fn default_public_prefix() -> String {
    "/audio".to_string()
}

fn default_speech_timeout_secs() -> u64 {
    30
}

fn default_audio_retention_hours() -> u64 {
    24
}

/// Expands `${VAR}` placeholders from the environment; unset variables become empty.
pub fn resolve_env_var(raw: &str) -> String {
    let mut output = String::new();
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);

        let candidate = &rest[start + 2..];
        let Some(end) = candidate.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let key = &candidate[..end];
        output.push_str(&std::env::var(key).unwrap_or_default());
        rest = &candidate[end + 1..];
    }

    output.push_str(rest);
    output
}

/// Reads the YAML config at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<AshfreeConfig> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        return Ok(AshfreeConfig::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    parse_config(&content)
        .with_context(|| format!("failed to parse yaml file: {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<AshfreeConfig> {
    let mut config: AshfreeConfig = serde_yaml::from_str(content)?;
    resolve_config_env(&mut config);
    validate_config(&config)?;
    Ok(config)
}

fn resolve_config_env(config: &mut AshfreeConfig) {
    config.server.bind = resolve_env_var(&config.server.bind);
    config.provider.model = resolve_env_var(&config.provider.model);
    if let Some(base_url) = config.provider.base_url.as_mut() {
        *base_url = resolve_env_var(base_url);
    }
    config.speech.base_url = resolve_env_var(&config.speech.base_url);
    for voice_id in config.speech.voices.values_mut() {
        *voice_id = resolve_env_var(voice_id);
    }
}

pub fn validate_config(config: &AshfreeConfig) -> Result<()> {
    if config.server.bind.trim().is_empty() {
        return Err(anyhow!("server.bind must not be empty"));
    }
    if config.provider.model.trim().is_empty() {
        return Err(anyhow!("provider.model must not be empty"));
    }
    if config.knowledge.retrieval_k == 0 {
        return Err(anyhow!("knowledge.retrieval_k must be at least 1"));
    }
    if config.provider.timeout_secs == 0 || config.speech.timeout_secs == 0 {
        return Err(anyhow!("timeouts must be at least one second"));
    }
    let costs = [config.dashboard.pack_cost, config.dashboard.packs_per_day];
    if costs.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(anyhow!("dashboard costs must be non-negative numbers"));
    }
    Ok(())
}

fn env_secret(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl GenerationConfig {
    fn needs_api_key(&self) -> bool {
        !matches!(
            self.provider_type,
            ProviderType::Ollama | ProviderType::Stub
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builds the generation client. A missing API key leaves the client
    /// unconfigured; every reply is then degraded.
    pub fn build_client(&self) -> Result<GenerationClient> {
        let mut provider_config = ProviderConfig::new(self.provider_type);
        provider_config.timeout_secs = self.timeout_secs;
        if let Some(base_url) = &self.base_url {
            provider_config = provider_config.with_base_url(base_url.clone());
        }
        if self.needs_api_key() {
            match env_secret(&self.api_key_env) {
                Some(key) => provider_config = provider_config.with_api_key(key),
                None => {
                    tracing::warn!(
                        env = %self.api_key_env,
                        "no API key in environment; generation disabled"
                    );
                    return Ok(GenerationClient::unconfigured());
                }
            }
        }

        let provider = create_provider(&provider_config)?;
        tracing::info!(
            provider = ?self.provider_type,
            model = %self.model,
            "generation provider ready"
        );
        Ok(GenerationClient::new(provider, self.model.clone(), self.timeout()))
    }
}

impl SpeechConfig {
    pub fn audio_retention(&self) -> Option<Duration> {
        (self.audio_retention_hours > 0)
            .then(|| Duration::from_secs(self.audio_retention_hours * 3600))
    }

    /// `None` when speech is disabled or no API key is available.
    pub fn build_service(&self) -> Option<SpeechService> {
        if !self.enabled {
            return None;
        }
        let Some(key) = env_secret(&self.api_key_env) else {
            tracing::warn!(env = %self.api_key_env, "no speech API key in environment; speech disabled");
            return None;
        };
        if !self.voices.contains_key(&VoiceProfile::Default) {
            tracing::warn!("speech.voices has no `default` entry; unmapped profiles will fail");
        }
        let synthesizer = ElevenLabsSynthesizer::new(
            key,
            self.base_url.clone(),
            self.voices.clone(),
            Duration::from_secs(self.timeout_secs),
        );
        Some(
            SpeechService::new(
                Arc::new(synthesizer),
                self.audio_dir.clone(),
                self.public_prefix.clone(),
            )
            .with_retention(self.audio_retention()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shipped_config_path() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../config/ashfree.yaml")
    }

    #[test]
    fn shipped_config_loads() {
        let config = load_config(&shipped_config_path()).unwrap();
        assert_eq!(config.provider.provider_type, ProviderType::Groq);
        assert_eq!(config.knowledge.retrieval_k, 3);
        assert!(!config.speech.enabled);
        assert_eq!(config.speech.voices.len(), 4);
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.provider.provider_type, ProviderType::Groq);
        assert_eq!(config.provider.model, DEFAULT_MODEL);
        assert_eq!(config.provider.api_key_env, "GROQ_API_KEY");
        assert_eq!(config.knowledge.retrieval_k, 3);
        assert_eq!(config.conversation.history_limit, 10);
        assert_eq!(
            config.conversation.dir.as_deref(),
            Some(Path::new("data/conversations"))
        );
        assert!(!config.speech.enabled);
        assert_eq!(config.speech.timeout_secs, 30);
        assert_eq!(
            config.speech.audio_retention(),
            Some(Duration::from_secs(24 * 3600))
        );
    }

    #[test]
    fn user_data_sections_default() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.users.dir, Path::new("data/users"));
        assert_eq!(
            config.calm.log_path.as_deref(),
            Some(Path::new("data/logs/calm_interactions.jsonl"))
        );
        assert_eq!(config.dashboard.pack_cost, 8.0);
        assert_eq!(config.dashboard.goal_days, 30);
    }

    #[test]
    fn negative_pack_cost_is_rejected() {
        let err = parse_config("dashboard:\n  pack_cost: -2\n").unwrap_err();
        assert!(err.to_string().contains("dashboard"));
    }

    #[test]
    fn zero_retention_keeps_audio() {
        let config = parse_config("speech:\n  audio_retention_hours: 0\n").unwrap();
        assert!(config.speech.audio_retention().is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = r#"
provider:
  type: ollama
  model: llama3
knowledge:
  retrieval_k: 5
speech:
  enabled: true
  voices:
    default: voice-a
    emergency: voice-b
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.provider.provider_type, ProviderType::Ollama);
        assert_eq!(config.provider.model, "llama3");
        assert_eq!(config.provider.timeout_secs, 60);
        assert_eq!(config.knowledge.retrieval_k, 5);
        assert_eq!(
            config.speech.voices.get(&VoiceProfile::Emergency).map(String::as_str),
            Some("voice-b")
        );
        assert_eq!(config.speech.public_prefix, "/audio");
    }

    #[test]
    fn null_conversation_dir_means_in_memory() {
        let config = parse_config("conversation:\n  dir: null\n").unwrap();
        assert!(config.conversation.dir.is_none());
    }

    #[test]
    fn zero_retrieval_k_is_rejected() {
        let err = parse_config("knowledge:\n  retrieval_k: 0\n").unwrap_err();
        assert!(err.to_string().contains("retrieval_k"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("nope.yaml")).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8000");
    }

    #[test]
    fn broken_yaml_names_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ashfree.yaml");
        std::fs::write(&path, "provider: [unclosed").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("ashfree.yaml"));
    }

    #[test]
    fn resolve_env_var_replaces_env_placeholder() {
        let expected = std::env::var("PATH").unwrap();
        assert_eq!(resolve_env_var("${PATH}"), expected);
    }

    #[test]
    fn resolve_env_var_returns_raw_when_not_placeholder() {
        assert_eq!(resolve_env_var("plain-value"), "plain-value");
    }

    #[test]
    fn resolve_env_var_unclosed_bracket() {
        assert_eq!(resolve_env_var("prefix_${UNCLOSED"), "prefix_${UNCLOSED");
    }

    #[test]
    fn missing_key_leaves_generation_unconfigured() {
        let config = GenerationConfig {
            api_key_env: "ASHFREE_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        let client = config.build_client().unwrap();
        assert!(!client.is_configured());
    }

    #[test]
    fn stub_provider_needs_no_key() {
        let config = GenerationConfig {
            provider_type: ProviderType::Stub,
            api_key_env: "ASHFREE_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        let client = config.build_client().unwrap();
        assert!(client.is_configured());
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn disabled_speech_builds_nothing() {
        assert!(SpeechConfig::default().build_service().is_none());
        let enabled_without_key = SpeechConfig {
            enabled: true,
            api_key_env: "ASHFREE_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        assert!(enabled_without_key.build_service().is_none());
    }
}
