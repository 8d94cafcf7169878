use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, Redirect};
use axum::Form;
use serde::Deserialize;

use crate::core::config::CredentialInput;
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub embedchain_api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModelForm {
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct PromptForm {
    #[serde(default)]
    pub prompt: String,
}

/// Renders the page from the current session, then drops the shown notice.
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let view = {
        let mut session = state.session.lock().await;
        let view = session.view();
        session.take_notice();
        view
    };

    let html = state.pages.render(&view).map_err(ApiError::internal)?;
    Ok(Html(html))
}

pub async fn submit_credentials(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CredentialsForm>,
) -> Redirect {
    let submitted = CredentialInput::new(form.openai_api_key, form.embedchain_api_key);
    let outcome = state.session.lock().await.submit_credentials(submitted).await;
    tracing::debug!("Credential submission: {:?}", outcome);
    Redirect::to("/")
}

pub async fn select_model(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ModelForm>,
) -> Redirect {
    state.session.lock().await.select_model(&form.model);
    Redirect::to("/")
}

pub async fn submit_prompt(
    State(state): State<Arc<AppState>>,
    Form(form): Form<PromptForm>,
) -> Redirect {
    state.session.lock().await.submit_prompt(&form.prompt).await;
    Redirect::to("/")
}

pub async fn reset_session(State(state): State<Arc<AppState>>) -> Redirect {
    state.reset_session().await;
    Redirect::to("/")
}
