use ashfree_core::{voice_for_style, CoachRequest};
use ashfree_schema::{CoachReply, ConversationTurn, UserContext};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    #[serde(default)]
    pub context: UserContext,
    #[serde(default)]
    pub with_audio: bool,
    #[serde(default)]
    pub conversation_style: Option<String>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(chat))
        .route("/history/{user_id}", get(history))
}

async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> ApiResult<Json<CoachReply>> {
    let audio = body
        .with_audio
        .then(|| voice_for_style(body.conversation_style.as_deref()));
    let reply = state
        .engine
        .respond(
            CoachRequest::new(body.user_id, body.message)
                .with_context(body.context)
                .with_audio(audio),
        )
        .await?;
    Ok(Json(reply))
}

async fn history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<ConversationTurn>>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(state.engine.history(&user_id, limit).await?))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use super::router;
    use crate::routes::test_support::{self, json_body, json_request};

    #[tokio::test]
    async fn chat_replies_and_reports_signals() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = router().with_state(test_support::state(tmp.path()));

        let response = app
            .oneshot(json_request(
                "POST",
                "/",
                serde_json::json!({
                    "user_id": "u1",
                    "message": "I really need a cigarette right now",
                    "context": {"days_smoke_free": 10, "cravings": 9}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["degraded"], false);
        assert_eq!(body["craving_detected"], true);
        assert_eq!(body["craving_intensity"], 8);
        assert!(body["text"].as_str().unwrap().starts_with("[stub:stub]"));
        assert_eq!(body["suggested_actions"].as_array().unwrap().len(), 4);
        assert!(body.get("audio_locator").is_none());
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = router().with_state(test_support::state(tmp.path()));

        let response = app
            .oneshot(json_request(
                "POST",
                "/",
                serde_json::json!({"user_id": "u1", "message": "  "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("message"));
    }

    #[tokio::test]
    async fn history_returns_recorded_turns() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = router().with_state(test_support::state(tmp.path()));

        for message in ["first", "second"] {
            let response = app
                .clone()
                .oneshot(json_request(
                    "POST",
                    "/",
                    serde_json::json!({"user_id": "u2", "message": message}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/history/u2?limit=3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let turns = json_body(response).await;
        let turns = turns.as_array().unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0]["sender"], "assistant");
        assert_eq!(turns[1]["text"], "second");
    }

    #[tokio::test]
    async fn history_rejects_bad_user_id() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = router().with_state(test_support::state(tmp.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/history/..hidden")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
