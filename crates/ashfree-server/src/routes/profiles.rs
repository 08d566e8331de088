use ashfree_memory::ProfileStore;
use ashfree_schema::UserProfile;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn profiles(state: &AppState) -> ApiResult<&ProfileStore> {
    state
        .profiles
        .as_deref()
        .ok_or_else(|| ApiError::Unavailable("user profiles are not configured".into()))
}

fn not_found(user_id: &str) -> ApiError {
    ApiError::NotFound(format!("user not found: {user_id}"))
}

async fn create_user(
    State(state): State<AppState>,
    Json(profile): Json<UserProfile>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let created = profiles(&state)?.create(profile).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserProfile>>> {
    Ok(Json(profiles(&state)?.list().await?))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    profiles(&state)?
        .get(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(&user_id))
}

async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(patch): Json<UserProfile>,
) -> ApiResult<Json<UserProfile>> {
    profiles(&state)?
        .update(&user_id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(&user_id))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    if profiles(&state)?.delete(&user_id).await? {
        Ok(Json(
            serde_json::json!({ "message": format!("User deleted: {user_id}") }),
        ))
    } else {
        Err(not_found(&user_id))
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use super::router;
    use crate::routes::test_support::{self, json_body, json_request};

    fn empty(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn profile_lifecycle() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = router().with_state(test_support::state(tmp.path()));

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/",
                serde_json::json!({"id": "sam", "name": "Sam", "packsPerDay": 1}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        assert!(created["createdAt"].as_str().is_some());

        let duplicate = app
            .clone()
            .oneshot(json_request("POST", "/", serde_json::json!({"id": "sam"})))
            .await
            .unwrap();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let updated = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/sam",
                serde_json::json!({"email": "sam@example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(updated.status(), StatusCode::OK);
        let updated = json_body(updated).await;
        assert_eq!(updated["name"], "Sam");
        assert_eq!(updated["email"], "sam@example.com");
        assert_eq!(updated["packsPerDay"], 1);

        let list = json_body(app.clone().oneshot(empty("GET", "/")).await.unwrap()).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let deleted = app.clone().oneshot(empty("DELETE", "/sam")).await.unwrap();
        assert_eq!(deleted.status(), StatusCode::OK);

        let missing = app.clone().oneshot(empty("GET", "/sam")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        let missing = app.oneshot(empty("DELETE", "/sam")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_of_unknown_user_is_404() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = router().with_state(test_support::state(tmp.path()));
        let response = app
            .oneshot(json_request("PUT", "/ghost", serde_json::json!({"name": "x"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
