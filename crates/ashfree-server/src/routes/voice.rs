use ashfree_core::{voice_for_style, CoachRequest};
use ashfree_schema::{ConversationMode, Emotion, SuggestedAction, UserContext};
use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct VoiceChatRequest {
    pub user_id: String,
    pub message: String,
    #[serde(default)]
    pub context: UserContext,
    #[serde(default = "default_style")]
    pub conversation_style: String,
}

fn default_style() -> String {
    "coaching".to_string()
}

#[derive(Serialize)]
pub struct VoiceChatResponse {
    pub response_text: String,
    pub audio_url: Option<String>,
    pub degraded: bool,
    pub craving_detected: bool,
    pub craving_intensity: Option<u8>,
    pub emotion: Option<Emotion>,
    pub suggested_actions: Vec<SuggestedAction>,
    pub follow_up_questions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crisis_resources: Option<String>,
}

#[derive(Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    #[serde(default)]
    pub voice_type: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/voice_chat", post(voice_chat))
        .route("/synthesize_audio", post(synthesize_audio))
}

async fn voice_chat(
    State(state): State<AppState>,
    Json(body): Json<VoiceChatRequest>,
) -> ApiResult<Json<VoiceChatResponse>> {
    let voice = voice_for_style(Some(&body.conversation_style));
    let reply = state
        .engine
        .respond(
            CoachRequest::new(body.user_id, body.message)
                .with_context(body.context)
                .with_mode(ConversationMode::Voice)
                .with_audio(Some(voice)),
        )
        .await?;

    Ok(Json(VoiceChatResponse {
        response_text: reply.text,
        audio_url: reply.audio_locator,
        degraded: reply.degraded,
        craving_detected: reply.craving_detected,
        craving_intensity: reply.craving_intensity,
        emotion: reply.emotion,
        suggested_actions: reply.suggested_actions,
        follow_up_questions: reply.follow_up_questions,
        crisis_resources: reply.crisis_resources,
    }))
}

async fn synthesize_audio(
    State(state): State<AppState>,
    Json(body): Json<SynthesizeRequest>,
) -> ApiResult<Response> {
    if body.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".into()));
    }
    let speech = state
        .engine
        .speech()
        .ok_or_else(|| ApiError::Unavailable("speech synthesis is not configured".into()))?;

    let voice = voice_for_style(body.voice_type.as_deref());
    let stream = speech.stream(&body.text, voice).await.map_err(|error| {
        tracing::warn!(%error, voice = voice.as_str(), "speech stream failed");
        ApiError::Unavailable(format!("speech synthesis failed: {error}"))
    })?;

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], Body::from_stream(stream)).into_response())
}
