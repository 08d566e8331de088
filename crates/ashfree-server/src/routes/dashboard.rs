use ashfree_schema::Dashboard;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/{user_id}", get(dashboard))
}

async fn dashboard(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Dashboard>> {
    Ok(Json(state.engine.dashboard(&user_id).await?))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use crate::routes::test_support::{self, json_body, json_request};

    #[tokio::test]
    async fn dashboard_reflects_plan_and_logged_cravings() {
        let tmp = tempfile::TempDir::new().unwrap();
        let state = test_support::state(tmp.path());
        let quit = chrono::Utc::now().date_naive() - chrono::Duration::days(8);
        let app = crate::routes::api_router().with_state(state);

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/quit-plan/u1",
                serde_json::json!({"quitDate": quit.format("%Y-%m-%d").to_string()}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        for entry in [
            serde_json::json!({"intensity": "high", "trigger": "stress", "smoked": false}),
            serde_json::json!({"intensity": "low", "trigger": "stress", "smoked": true}),
        ] {
            app.clone()
                .oneshot(json_request("POST", "/cravings/u1", entry))
                .await
                .unwrap();
        }

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/dashboard/u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["days_smoke_free"], 8);
        assert_eq!(body["money_saved"], 64.0);
        assert_eq!(body["goal_percentage"], 26);
        assert_eq!(body["cravings"]["total"], 2);
        assert_eq!(body["cravings"]["resisted"], 1);
        assert_eq!(body["top_triggers"][0], "stress");
        assert_eq!(body["health_improvements"].as_array().unwrap().len(), 4);
        assert_eq!(
            body["progress_message"],
            "You're doing great! Your body is starting to heal."
        );
    }
}
