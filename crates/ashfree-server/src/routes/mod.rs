pub mod calm;
pub mod chat;
pub mod cravings;
pub mod dashboard;
pub mod documents;
pub mod health;
pub mod knowledge;
pub mod plans;
pub mod profiles;
pub mod voice;

use axum::Router;

use crate::state::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/chat", chat::router())
        .nest("/knowledge", knowledge::router())
        .nest("/documents", documents::router())
        .nest("/cravings", cravings::router())
        .nest("/quit-plan", plans::router())
        .nest("/dashboard", dashboard::router())
        .nest("/users", profiles::router())
        .nest("/health", health::router())
        .merge(voice::router())
        .merge(calm::router())
}
