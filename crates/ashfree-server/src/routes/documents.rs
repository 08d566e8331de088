use ashfree_core::{CoachRequest, DocumentAnalysis, DocumentContext, DocumentReport};
use ashfree_schema::{CoachReply, ConversationMode, UserContext};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Deserialize)]
pub struct DocumentChatRequest {
    pub user_id: String,
    pub message: String,
    pub document_text: String,
    #[serde(default)]
    pub analysis: Option<DocumentAnalysis>,
    #[serde(default)]
    pub context: UserContext,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/analyze",
            post(analyze).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/chat", post(document_chat))
}

fn extension_of(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<DocumentReport>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let extension = extension_of(&file_name).ok_or_else(|| {
            ApiError::BadRequest(format!("cannot tell the format of {file_name:?}"))
        })?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;

        tracing::info!(file = %file_name, bytes = bytes.len(), "document uploaded");
        let report = state
            .engine
            .analyze_document(bytes.to_vec(), &extension)
            .await?;
        return Ok(Json(report));
    }
    Err(ApiError::BadRequest("missing `file` field".into()))
}

async fn document_chat(
    State(state): State<AppState>,
    Json(body): Json<DocumentChatRequest>,
) -> ApiResult<Json<CoachReply>> {
    let reply = state
        .engine
        .respond(
            CoachRequest::new(body.user_id, body.message)
                .with_context(body.context)
                .with_mode(ConversationMode::DocumentQa)
                .with_document(DocumentContext {
                    text: body.document_text,
                    analysis: body.analysis,
                }),
        )
        .await?;
    Ok(Json(reply))
}
