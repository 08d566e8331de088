use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CRAVING_INTENSITY: u8 = 5;
pub const SCALE_MAX: u8 = 10;
pub const DEFAULT_DAYS_SMOKE_FREE: u32 = 0;

/// Per-request description of where the user currently stands.
///
/// Every field is optional; the context formatter decides how absent values
/// are rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(default)]
    pub mood: Option<String>,
    /// 0-10. Older clients send this as `cravings`.
    #[serde(default, alias = "cravings", deserialize_with = "scale_0_10")]
    pub craving_intensity: Option<u8>,
    #[serde(default)]
    pub days_smoke_free: Option<u32>,
    /// 0-10.
    #[serde(default, deserialize_with = "scale_0_10")]
    pub stress_level: Option<u8>,
    #[serde(default)]
    pub quit_attempts: Option<u32>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub quit_date: Option<String>,
    #[serde(default)]
    pub last_smoke: Option<String>,
    #[serde(default)]
    pub support_network: Vec<String>,
    #[serde(default)]
    pub preferred_coping_strategies: Vec<String>,
    #[serde(default)]
    pub time_of_day: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub sleep_hours: Option<u32>,
    #[serde(default)]
    pub exercise_minutes: Option<u32>,
    #[serde(default)]
    pub water_intake: Option<u32>,
    #[serde(default)]
    pub caffeine_intake: Option<u32>,
    #[serde(default)]
    pub alcohol_intake: Option<u32>,
    #[serde(default)]
    pub craving_stats: Option<CravingSummary>,
    /// Anything the client knows that has no dedicated field.
    #[serde(default)]
    pub other_context: BTreeMap<String, serde_json::Value>,
}

impl UserContext {
    pub fn craving_intensity_or_default(&self) -> u8 {
        self.craving_intensity.unwrap_or(DEFAULT_CRAVING_INTENSITY)
    }

    pub fn days_smoke_free_or_default(&self) -> u32 {
        self.days_smoke_free.unwrap_or(DEFAULT_DAYS_SMOKE_FREE)
    }
}

/// Reads any JSON number and clamps it onto the 0-10 scale.
fn scale_0_10<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map(|v| {
        if v.is_nan() {
            0
        } else {
            v.round().clamp(0.0, f64::from(SCALE_MAX)) as u8
        }
    }))
}

/// Compact craving statistics that can be folded into a prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CravingSummary {
    pub total: usize,
    #[serde(default)]
    pub average_intensity: Option<f32>,
    #[serde(default)]
    pub last_24h: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Anxious,
    Calm,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Anxious => "anxious",
            Self::Calm => "calm",
        }
    }
}

/// One message in a user's conversation log. Never mutated once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_locator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<Emotion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub craving_detected: Option<bool>,
}

impl ConversationTurn {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
            audio_locator: None,
            emotion: None,
            craving_detected: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }

    pub fn with_audio_locator(mut self, locator: Option<String>) -> Self {
        self.audio_locator = locator;
        self
    }

    pub fn with_signals(mut self, emotion: Option<Emotion>, craving_detected: bool) -> Self {
        self.emotion = emotion;
        self.craving_detected = Some(craving_detected);
        self
    }
}

fn default_source() -> String {
    "Unknown".to_string()
}

/// A unit of reference text in the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnowledgePassage {
    #[serde(alias = "content")]
    pub text: String,
    #[serde(default = "default_source")]
    pub source: String,
}

impl KnowledgePassage {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrievalResult {
    pub text: String,
    pub source: String,
    pub score: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    #[default]
    Chat,
    Voice,
    DocumentQa,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestedAction {
    pub id: String,
    pub name: String,
    pub icon: String,
}

impl SuggestedAction {
    pub fn new(id: &str, name: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
        }
    }
}

/// What a caller gets back from one coaching exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoachReply {
    pub text: String,
    /// True when generation failed and `text` is the fallback message.
    #[serde(default)]
    pub degraded: bool,
    pub craving_detected: bool,
    #[serde(default)]
    pub craving_intensity: Option<u8>,
    #[serde(default)]
    pub emotion: Option<Emotion>,
    #[serde(default)]
    pub suggested_actions: Vec<SuggestedAction>,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crisis_resources: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_locator: Option<String>,
}

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum CravingLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl CravingLevel {
    /// Numeric value on the 0-10 scale used by `UserContext`.
    pub fn score(&self) -> u8 {
        match self {
            Self::Low => 3,
            Self::Medium => 5,
            Self::High => 8,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CravingEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub intensity: CravingLevel,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default, alias = "copingStrategy")]
    pub coping_strategy: Option<String>,
    #[serde(default)]
    pub smoked: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CravingStats {
    pub total_cravings: usize,
    pub triggers: BTreeMap<String, usize>,
    pub intensities: BTreeMap<CravingLevel, usize>,
    pub coping_strategies: BTreeMap<String, usize>,
    /// Percentage of cravings that did not end in smoking, one decimal.
    pub success_rate: f64,
}

/// A guided breathing pattern shown alongside calming audio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BreathingExercise {
    pub name: String,
    pub description: String,
    /// Seconds.
    pub duration: u32,
    pub steps: Vec<String>,
}

/// Result of a calm-down request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalmReply {
    pub message: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    /// Minutes the client should keep the session open.
    pub duration: u32,
    pub breathing_exercise: BreathingExercise,
    #[serde(default)]
    pub suggested_actions: Vec<SuggestedAction>,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crisis_resources: Option<String>,
}

/// One line of the calm-interaction journal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalmRecord {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub context: UserContext,
    pub message: String,
    pub emergency_mode: bool,
}

/// A user's quit plan. Field names follow the web client's camelCase.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuitPlan {
    #[serde(default)]
    pub quit_date: Option<NaiveDate>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub coping_strategies: Vec<String>,
    #[serde(default)]
    pub support_people: Vec<String>,
    #[serde(default)]
    pub rewards: Vec<String>,
}

/// Stored profile. Unknown keys are kept verbatim in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CravingTally {
    pub resisted: usize,
    pub total: usize,
}

/// Progress overview derived from the quit plan and craving log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dashboard {
    pub user_id: String,
    pub days_smoke_free: u32,
    /// Share of the smoke-free goal reached, 0-100.
    pub goal_percentage: u8,
    pub progress_message: String,
    pub money_saved: f64,
    pub health_improvements: Vec<String>,
    pub cravings: CravingTally,
    pub top_triggers: Vec<String>,
}
