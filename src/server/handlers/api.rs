use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::session::PromptOutcome;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: String,
}

pub async fn history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.session.lock().await;
    Json(json!({
        "ready": session.is_ready(),
        "selected_model": session.selected_model(),
        "entries": session.conversation().all(),
    }))
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut session = state.session.lock().await;
    let outcome = session.submit_prompt(&payload.prompt).await;
    // API callers get the message in the response, not on the next page load.
    let notice = session.take_notice();
    let message = notice
        .as_ref()
        .map(|n| n.message().to_string())
        .unwrap_or_default();

    match outcome {
        PromptOutcome::Answered(entry) => Ok(Json(json!({
            "prompt": entry.prompt,
            "response": entry.response,
            "entries": session.conversation().len(),
        }))),
        PromptOutcome::NotReady => Err(ApiError::ServiceUnavailable(message)),
        PromptOutcome::Empty => Err(ApiError::BadRequest(message)),
        PromptOutcome::Failed(err) => Err(ApiError::BadGateway(err.to_string())),
    }
}

pub async fn reset_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.reset_session().await;
    let session = state.session.lock().await;
    Json(json!({ "ready": session.is_ready() }))
}
