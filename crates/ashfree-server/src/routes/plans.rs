use ashfree_core::default_quit_plan;
use ashfree_memory::PlanStore;
use ashfree_schema::QuitPlan;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/{user_id}", get(get_plan).put(put_plan))
}

fn plan_store(state: &AppState) -> ApiResult<&PlanStore> {
    state
        .engine
        .plans()
        .ok_or_else(|| ApiError::Unavailable("quit plans are not configured".into()))
}

/// The saved plan, or a starter plan quitting today when none was saved.
async fn get_plan(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<QuitPlan>> {
    let stored = plan_store(&state)?.get(&user_id).await?;
    Ok(Json(
        stored.unwrap_or_else(|| default_quit_plan(Utc::now().date_naive())),
    ))
}

async fn put_plan(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(plan): Json<QuitPlan>,
) -> ApiResult<Json<QuitPlan>> {
    Ok(Json(plan_store(&state)?.put(&user_id, plan).await?))
}
