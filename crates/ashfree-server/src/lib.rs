pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ashfree_core::CoachEngine;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new().nest("/api", routes::api_router());
    if let Some(speech) = state.engine.speech() {
        router = router.nest_service(speech.public_prefix(), ServeDir::new(speech.audio_dir()));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

const AUDIO_SWEEP_EVERY: Duration = Duration::from_secs(3600);
const MIN_AUDIO_SWEEP_EVERY: Duration = Duration::from_secs(1);

/// Periodically deletes expired audio clips. None when speech is off or
/// clips are kept forever.
pub fn spawn_audio_sweeper(engine: Arc<CoachEngine>) -> Option<tokio::task::JoinHandle<()>> {
    let retention = engine.speech()?.retention()?;
    tracing::info!(retention_secs = retention.as_secs(), "audio sweeper started");
    Some(tokio::spawn(async move {
        let period = AUDIO_SWEEP_EVERY.min(retention).max(MIN_AUDIO_SWEEP_EVERY);
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if let Some(speech) = engine.speech() {
                speech.sweep_expired().await;
            }
        }
    }))
}

pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let _sweeper = spawn_audio_sweeper(state.engine.clone());
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("ashfree listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use ashfree_core::SpeechService;
    use ashfree_provider::{SpeechSynthesizer, VoiceProfile};
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support;

    struct Silence;

    #[async_trait]
    impl SpeechSynthesizer for Silence {
        async fn synthesize(&self, _text: &str, _voice: VoiceProfile) -> Result<bytes::Bytes> {
            Ok(bytes::Bytes::from_static(b"ID3"))
        }
    }

    #[tokio::test]
    async fn sweeper_runs_only_with_retention() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(spawn_audio_sweeper(Arc::new(test_support::engine(tmp.path()))).is_none());

        let keep_forever = test_support::engine(tmp.path()).with_speech(SpeechService::new(
            Arc::new(Silence),
            tmp.path().join("audio"),
            "/audio",
        ));
        assert!(spawn_audio_sweeper(Arc::new(keep_forever)).is_none());

        let clip = tmp.path().join("audio").join("old.mp3");
        std::fs::create_dir_all(clip.parent().unwrap()).unwrap();
        std::fs::write(&clip, b"ID3").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let expiring = test_support::engine(tmp.path()).with_speech(
            SpeechService::new(Arc::new(Silence), tmp.path().join("audio"), "/audio")
                .with_retention(Some(Duration::from_millis(10))),
        );
        let handle = spawn_audio_sweeper(Arc::new(expiring)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();
        assert!(!clip.exists());
    }

    #[tokio::test]
    async fn api_is_mounted_under_prefix() {
        let tmp = tempfile::TempDir::new().unwrap();
        let app = create_router(test_support::state(tmp.path()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/dashboard/u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
