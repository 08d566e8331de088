//! The coaching pipeline: signals, retrieval, prompt, generation, persistence.

use std::sync::Arc;

use ashfree_memory::{
    validate_user_id, CalmJournal, ConversationStore, CravingLog, JsonlTurnStore,
    KnowledgeStore, PlanStore,
};
use ashfree_provider::VoiceProfile;
use ashfree_schema::{
    CalmRecord, CalmReply, CoachReply, ConversationMode, ConversationTurn, Dashboard,
    RetrievalResult, UserContext,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::calm::{breathing_exercise, calm_message, DEFAULT_CALM_MINUTES, EMERGENCY_MESSAGE};
use crate::config::{AshfreeConfig, DashboardConfig};
use crate::dashboard::build_dashboard;
use crate::document::{
    analysis_context, analysis_prompt, parse_analysis, DefaultExtractor, DocumentAnalysis,
    DocumentExtractor,
};
use crate::error::{CoachError, CoachResult};
use crate::generation::{GenerationClient, GenerationProfile};
use crate::prompt::{compose, DocumentInput, PromptInputs};
use crate::retriever::{retrieve, DEFAULT_RETRIEVAL_K};
use crate::sanitize::sanitize;
use crate::signals::{
    detect_craving, detect_crisis, detect_emotion, follow_up_questions, suggested_actions,
    CRISIS_RESOURCES,
};
use crate::speech::SpeechService;

pub const DEGRADED_REPLY: &str = "I'm having trouble right now, please try again in a moment.";
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// A document attached to a `document_qa` exchange.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentContext {
    pub text: String,
    #[serde(default)]
    pub analysis: Option<DocumentAnalysis>,
}

#[derive(Debug, Clone)]
pub struct CoachRequest {
    pub user_id: String,
    pub message: String,
    pub context: UserContext,
    pub mode: ConversationMode,
    pub document: Option<DocumentContext>,
    /// Voice for a spoken copy of the reply; `None` skips synthesis.
    pub audio: Option<VoiceProfile>,
}

impl CoachRequest {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            context: UserContext::default(),
            mode: ConversationMode::Chat,
            document: None,
            audio: None,
        }
    }

    pub fn with_context(mut self, context: UserContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_mode(mut self, mode: ConversationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_document(mut self, document: DocumentContext) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_audio(mut self, voice: Option<VoiceProfile>) -> Self {
        self.audio = voice;
        self
    }
}

/// A request for scripted calming content, optionally voiced.
#[derive(Debug, Clone)]
pub struct CalmRequest {
    pub user_id: String,
    pub context: UserContext,
    pub voice: VoiceProfile,
    pub minutes: u32,
    /// Forces the emergency script and voice.
    pub emergency: bool,
}

impl CalmRequest {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            context: UserContext::default(),
            voice: VoiceProfile::Calming,
            minutes: DEFAULT_CALM_MINUTES,
            emergency: false,
        }
    }
}

/// Extracted text plus the model's structured reading of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub text: String,
    pub analysis: DocumentAnalysis,
}

pub struct CoachEngine {
    knowledge: Arc<KnowledgeStore>,
    conversations: Arc<ConversationStore>,
    cravings: Option<CravingLog>,
    plans: Option<PlanStore>,
    calm_journal: Option<CalmJournal>,
    dashboard: DashboardConfig,
    generation: GenerationClient,
    speech: Option<SpeechService>,
    extractor: Arc<dyn DocumentExtractor>,
    retrieval_k: usize,
    history_limit: usize,
}

impl CoachEngine {
    pub fn new(
        knowledge: Arc<KnowledgeStore>,
        conversations: Arc<ConversationStore>,
        generation: GenerationClient,
    ) -> Self {
        Self {
            knowledge,
            conversations,
            cravings: None,
            plans: None,
            calm_journal: None,
            dashboard: DashboardConfig::default(),
            generation,
            speech: None,
            extractor: Arc::new(DefaultExtractor),
            retrieval_k: DEFAULT_RETRIEVAL_K,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Wires every component from configuration. Missing credentials degrade
    /// the affected feature instead of failing startup.
    pub fn from_config(config: &AshfreeConfig) -> anyhow::Result<Self> {
        let knowledge = Arc::new(KnowledgeStore::new(config.knowledge.path.clone()));
        let conversations = match &config.conversation.dir {
            Some(dir) => ConversationStore::new(Arc::new(JsonlTurnStore::new(dir)))
                .with_tail_window(config.conversation.history_limit),
            None => {
                tracing::info!("no conversation dir configured, history kept in memory");
                ConversationStore::in_memory().with_tail_window(config.conversation.history_limit)
            }
        };
        let generation = config.provider.build_client()?;

        let mut engine = Self::new(knowledge, Arc::new(conversations), generation)
            .with_cravings(CravingLog::new(&config.cravings.dir))
            .with_plans(PlanStore::new(&config.users.dir))
            .with_dashboard(config.dashboard.clone())
            .with_limits(config.knowledge.retrieval_k, config.conversation.history_limit);
        if let Some(path) = &config.calm.log_path {
            engine = engine.with_calm_journal(CalmJournal::new(path));
        }
        if let Some(speech) = config.speech.build_service() {
            engine = engine.with_speech(speech);
        }
        Ok(engine)
    }

    pub fn with_cravings(mut self, cravings: CravingLog) -> Self {
        self.cravings = Some(cravings);
        self
    }

    pub fn with_plans(mut self, plans: PlanStore) -> Self {
        self.plans = Some(plans);
        self
    }

    pub fn with_calm_journal(mut self, journal: CalmJournal) -> Self {
        self.calm_journal = Some(journal);
        self
    }

    pub fn with_dashboard(mut self, dashboard: DashboardConfig) -> Self {
        self.dashboard = dashboard;
        self
    }

    pub fn with_speech(mut self, speech: SpeechService) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn DocumentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_limits(mut self, retrieval_k: usize, history_limit: usize) -> Self {
        self.retrieval_k = retrieval_k.max(1);
        self.history_limit = history_limit;
        self
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.knowledge
    }

    pub fn cravings(&self) -> Option<&CravingLog> {
        self.cravings.as_ref()
    }

    pub fn plans(&self) -> Option<&PlanStore> {
        self.plans.as_ref()
    }

    pub fn speech(&self) -> Option<&SpeechService> {
        self.speech.as_ref()
    }

    pub fn generation(&self) -> &GenerationClient {
        &self.generation
    }

    /// Runs one exchange and records it in the user's history.
    ///
    /// Generation failures produce a degraded reply rather than an error; only
    /// invalid input is rejected.
    pub async fn respond(&self, request: CoachRequest) -> CoachResult<CoachReply> {
        let CoachRequest {
            user_id,
            message,
            mut context,
            mode,
            document,
            audio,
        } = request;

        if message.trim().is_empty() {
            return Err(CoachError::InvalidInput("message must not be empty".into()));
        }
        validate_user_id(&user_id)?;
        let document = match mode {
            ConversationMode::DocumentQa => match document {
                Some(doc) if !doc.text.trim().is_empty() => Some(doc),
                _ => {
                    return Err(CoachError::InvalidInput(
                        "document_qa mode needs document text".into(),
                    ))
                }
            },
            _ => None,
        };

        if context.craving_stats.is_none() {
            context.craving_stats = self.craving_summary(&user_id).await;
        }

        let (craving_detected, craving_intensity) = detect_craving(&message);
        let emotion = detect_emotion(&message);
        let crisis = detect_crisis(&message);
        if crisis {
            tracing::warn!(user_id = %user_id, "crisis language detected");
        }

        let passages: Vec<RetrievalResult> = match mode {
            ConversationMode::DocumentQa => Vec::new(),
            _ => retrieve(&self.knowledge, &message, self.retrieval_k).await,
        };

        let history = match self.conversations.recent(&user_id, self.history_limit).await {
            Ok(history) => history,
            Err(error) => {
                tracing::warn!(user_id = %user_id, %error, "failed to load history, continuing without it");
                Vec::new()
            }
        };

        let rendered_analysis = document
            .as_ref()
            .and_then(|doc| doc.analysis.as_ref())
            .map(analysis_context);
        let prompt = compose(&PromptInputs {
            mode,
            context: &context,
            message: &message,
            history: &history,
            passages: &passages,
            document: document.as_ref().map(|doc| DocumentInput {
                text: &doc.text,
                analysis_context: rendered_analysis.as_deref(),
            }),
        });

        tracing::info!(
            user_id = %user_id,
            mode = ?mode,
            passages = passages.len(),
            history = history.len(),
            craving_detected,
            "composing reply"
        );

        let user_turn =
            ConversationTurn::user(message.clone()).with_signals(emotion, craving_detected);

        let generated = self
            .generation
            .generate(&prompt, GenerationProfile::CONVERSATIONAL)
            .await
            .map(|raw| sanitize(&raw));
        let text = match generated {
            Ok(text) if !text.is_empty() => text,
            outcome => {
                match outcome {
                    Err(error) => tracing::warn!(user_id = %user_id, %error, "generation failed, replying degraded"),
                    Ok(_) => tracing::warn!(user_id = %user_id, "completion was empty after sanitizing, replying degraded"),
                }
                self.persist(&user_id, user_turn).await;
                return Ok(CoachReply {
                    text: DEGRADED_REPLY.to_string(),
                    degraded: true,
                    craving_detected,
                    craving_intensity,
                    emotion,
                    suggested_actions: suggested_actions(&context, &message),
                    follow_up_questions: follow_up_questions(&context, &message),
                    crisis_resources: crisis.then(|| CRISIS_RESOURCES.to_string()),
                    audio_locator: None,
                });
            }
        };

        let audio_locator = match (audio, &self.speech) {
            (Some(voice), Some(speech)) => {
                let voice = if crisis { VoiceProfile::Emergency } else { voice };
                speech.render(&text, voice).await
            }
            (Some(_), None) => {
                tracing::debug!("audio requested but speech is not configured");
                None
            }
            _ => None,
        };

        self.persist(&user_id, user_turn).await;
        self.persist(
            &user_id,
            ConversationTurn::assistant(text.clone()).with_audio_locator(audio_locator.clone()),
        )
        .await;

        Ok(CoachReply {
            text,
            degraded: false,
            craving_detected,
            craving_intensity,
            emotion,
            suggested_actions: suggested_actions(&context, &message),
            follow_up_questions: follow_up_questions(&context, &message),
            crisis_resources: crisis.then(|| CRISIS_RESOURCES.to_string()),
            audio_locator,
        })
    }

    /// The last `limit` turns for `user_id`, oldest first.
    pub async fn history(&self, user_id: &str, limit: usize) -> CoachResult<Vec<ConversationTurn>> {
        Ok(self.conversations.recent(user_id, limit).await?)
    }

    /// Scripted calming message, breathing exercise and optional audio.
    ///
    /// Never calls the model. Speech and journal failures only drop the
    /// audio or the journal line.
    pub async fn calm(&self, request: CalmRequest) -> CoachResult<CalmReply> {
        let CalmRequest {
            user_id,
            context,
            voice,
            minutes,
            emergency,
        } = request;
        validate_user_id(&user_id)?;

        let (message, voice) = if emergency {
            (EMERGENCY_MESSAGE.to_string(), VoiceProfile::Emergency)
        } else {
            (calm_message(&context), voice)
        };
        let audio_url = match &self.speech {
            Some(speech) => speech.render(&message, voice).await,
            None => None,
        };

        let reply = CalmReply {
            message,
            audio_url,
            duration: minutes,
            breathing_exercise: breathing_exercise(&context),
            suggested_actions: suggested_actions(&context, ""),
            follow_up_questions: follow_up_questions(&context, ""),
            crisis_resources: emergency.then(|| CRISIS_RESOURCES.to_string()),
        };
        tracing::info!(user_id = %user_id, emergency, voice = voice.as_str(), "calm session");

        if let Some(journal) = &self.calm_journal {
            let record = CalmRecord {
                user_id,
                timestamp: Utc::now(),
                context,
                message: reply.message.clone(),
                emergency_mode: emergency,
            };
            if let Err(error) = journal.record(&record).await {
                tracing::warn!(%error, "failed to journal calm session");
            }
        }
        Ok(reply)
    }

    /// Progress derived from the stored quit plan and craving log.
    pub async fn dashboard(&self, user_id: &str) -> CoachResult<Dashboard> {
        validate_user_id(user_id)?;
        let plan = match &self.plans {
            Some(plans) => plans.get(user_id).await?,
            None => None,
        };
        let cravings = match &self.cravings {
            Some(log) => log.recent(user_id, usize::MAX).await?,
            None => Vec::new(),
        };
        Ok(build_dashboard(
            user_id,
            plan.as_ref(),
            &cravings,
            Utc::now().date_naive(),
            &self.dashboard,
        ))
    }

    /// Extracts an uploaded document and asks the model for a structured reading.
    ///
    /// Extraction errors are returned; generation and parse failures yield a
    /// fallback analysis describing what went wrong.
    pub async fn analyze_document(
        &self,
        bytes: Vec<u8>,
        extension: &str,
    ) -> CoachResult<DocumentReport> {
        let extractor = self.extractor.clone();
        let ext = extension.to_string();
        let text = tokio::task::spawn_blocking(move || extractor.extract(&bytes, &ext))
            .await
            .map_err(|error| CoachError::Task(error.to_string()))??;

        tracing::info!(extension, chars = text.len(), "document extracted");

        let analysis = match self
            .generation
            .generate(&analysis_prompt(&text), GenerationProfile::ANALYTICAL)
            .await
        {
            Ok(raw) => parse_analysis(&raw).unwrap_or_else(|| {
                tracing::warn!(raw = %raw, "could not parse document analysis");
                DocumentAnalysis::unparseable(&raw)
            }),
            Err(error) => {
                tracing::warn!(%error, "document analysis failed");
                DocumentAnalysis::generation_failed(&error)
            }
        };

        Ok(DocumentReport { text, analysis })
    }

    async fn craving_summary(&self, user_id: &str) -> Option<ashfree_schema::CravingSummary> {
        let cravings = self.cravings.as_ref()?;
        match cravings.summary(user_id).await {
            Ok(summary) => summary,
            Err(error) => {
                tracing::warn!(user_id = %user_id, %error, "failed to read craving log");
                None
            }
        }
    }

    async fn persist(&self, user_id: &str, turn: ConversationTurn) {
        if let Err(error) = self.conversations.append(user_id, turn).await {
            tracing::warn!(user_id = %user_id, %error, "failed to persist conversation turn");
        }
    }
}
