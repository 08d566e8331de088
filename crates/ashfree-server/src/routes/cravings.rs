use ashfree_memory::CravingLog;
use ashfree_schema::{CravingEntry, CravingStats};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}", get(recent_cravings).post(log_craving))
        .route("/{user_id}/stats", get(craving_stats))
}

fn craving_log(state: &AppState) -> ApiResult<&CravingLog> {
    state
        .engine
        .cravings()
        .ok_or_else(|| ApiError::Unavailable("craving log is not configured".into()))
}

async fn log_craving(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(entry): Json<CravingEntry>,
) -> ApiResult<(StatusCode, Json<CravingEntry>)> {
    let stored = craving_log(&state)?.log(&user_id, entry).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn recent_cravings(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Json<Vec<CravingEntry>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Ok(Json(craving_log(&state)?.recent(&user_id, limit).await?))
}

async fn craving_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<CravingStats>> {
    Ok(Json(craving_log(&state)?.stats(&user_id).await?))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use super::router;
    use crate::routes::test_support::{self, json_body, json_request};

    #[tokio::test]
    async fn logged_cravings_show_up_in_recent_and_stats() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = router().with_state(test_support::state(tmp.path()));

        let entries = [
            serde_json::json!({"intensity": "high", "trigger": "coffee", "copingStrategy": "walk", "smoked": false}),
            serde_json::json!({"intensity": "low", "smoked": true}),
        ];
        for entry in entries {
            let response = app
                .clone()
                .oneshot(json_request("POST", "/u1", entry))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
            let stored = json_body(response).await;
            assert!(stored["id"].as_str().unwrap().starts_with("craving_"));
        }

        let recent = app
            .clone()
            .oneshot(Request::builder().uri("/u1?limit=1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let recent = json_body(recent).await;
        assert_eq!(recent.as_array().unwrap().len(), 1);
        assert_eq!(recent[0]["intensity"], "low");

        let stats = app
            .oneshot(Request::builder().uri("/u1/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(stats.status(), StatusCode::OK);
        let stats = json_body(stats).await;
        assert_eq!(stats["total_cravings"], 2);
        assert_eq!(stats["triggers"]["coffee"], 1);
        assert_eq!(stats["triggers"]["Unknown"], 1);
        assert_eq!(stats["success_rate"], 50.0);
    }

    #[tokio::test]
    async fn bad_user_id_is_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = router().with_state(test_support::state(tmp.path()));

        let response = app
            .oneshot(json_request(
                "POST",
                "/bad%20id",
                serde_json::json!({"intensity": "medium"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
