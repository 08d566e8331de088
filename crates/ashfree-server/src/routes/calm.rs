use ashfree_core::{voice_for_style, CalmRequest, DEFAULT_CALM_MINUTES};
use ashfree_schema::{CalmReply, UserContext};
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CalmBody {
    pub user_id: String,
    #[serde(default)]
    pub context: UserContext,
    /// Conversation style naming the voice; calming when absent.
    #[serde(default)]
    pub voice_type: Option<String>,
    #[serde(default = "default_minutes")]
    pub duration: u32,
    #[serde(default)]
    pub emergency_mode: bool,
}

fn default_minutes() -> u32 {
    DEFAULT_CALM_MINUTES
}

pub fn router() -> Router<AppState> {
    Router::new().route("/voice/calm", post(calm))
}

async fn calm(
    State(state): State<AppState>,
    Json(body): Json<CalmBody>,
) -> ApiResult<Json<CalmReply>> {
    let mut request = CalmRequest::new(body.user_id);
    request.context = body.context;
    request.minutes = body.duration;
    request.emergency = body.emergency_mode;
    if let Some(style) = body.voice_type.as_deref() {
        request.voice = voice_for_style(Some(style));
    }
    Ok(Json(state.engine.calm(request).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::router;
    use crate::routes::test_support::{self, json_body, json_request};

    #[tokio::test]
    async fn high_craving_gets_478_breathing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = router().with_state(test_support::state(tmp.path()));

        let response = app
            .oneshot(json_request(
                "POST",
                "/voice/calm",
                serde_json::json!({"user_id": "u1", "context": {"cravings": 9}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Take a deep breath."));
        assert_eq!(body["breathing_exercise"]["name"], "4-7-8 Breathing");
        assert_eq!(body["duration"], 5);
        assert!(body["audio_url"].is_null());
        assert!(body.get("crisis_resources").is_none());
    }

    #[tokio::test]
    async fn emergency_mode_attaches_resources() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = router().with_state(test_support::state(tmp.path()));

        let response = app
            .oneshot(json_request(
                "POST",
                "/voice/calm",
                serde_json::json!({"user_id": "u1", "emergency_mode": true, "duration": 10}),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("I'm here with you right now."));
        assert!(body["crisis_resources"].as_str().is_some());
        assert_eq!(body["duration"], 10);
    }

    #[tokio::test]
    async fn bad_user_id_is_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = router().with_state(test_support::state(tmp.path()));
        let response = app
            .oneshot(json_request(
                "POST",
                "/voice/calm",
                serde_json::json!({"user_id": "../etc"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
