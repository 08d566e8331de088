use ashfree_schema::KnowledgePassage;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_passages).post(add_passage))
}

async fn list_passages(State(state): State<AppState>) -> ApiResult<Json<Vec<KnowledgePassage>>> {
    let snapshot = state.engine.knowledge().snapshot().await?;
    Ok(Json(snapshot.as_ref().clone()))
}

/// 201 for a new passage, 200 when identical text is already stored.
async fn add_passage(
    State(state): State<AppState>,
    Json(mut passage): Json<KnowledgePassage>,
) -> ApiResult<(StatusCode, Json<KnowledgePassage>)> {
    passage.text = passage.text.trim().to_string();
    if passage.text.is_empty() {
        return Err(ApiError::BadRequest("passage text must not be empty".into()));
    }
    let added = state.engine.knowledge().append(passage.clone()).await?;
    let status = if added {
        tracing::info!(source = %passage.source, "knowledge passage added");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(passage)))
}
