use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{api, chat, health};
use crate::state::AppState;

/// Creates the application router.
///
/// - `/` and its form endpoints drive the chat page
/// - `/api/*` exposes the same session as JSON
/// - `/health` for liveness checks
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(chat::index))
        .route("/credentials", post(chat::submit_credentials))
        .route("/model", post(chat::select_model))
        .route("/prompt", post(chat::submit_prompt))
        .route("/session/reset", post(chat::reset_session))
        .route("/api/history", get(api::history))
        .route("/api/chat", post(api::chat))
        .route("/api/session/reset", post(api::reset_session))
        .route("/health", get(health::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
