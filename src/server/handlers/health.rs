use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ready = state.session.lock().await.is_ready();
    Json(json!({
        "status": "ok",
        "ready": ready,
        "version": env!("CARGO_PKG_VERSION")
    }))
}
