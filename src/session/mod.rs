//! The interaction loop of one chat session.
//!
//! A session starts Unauthenticated and becomes Ready once both API keys are
//! known and the assistant has been built. Every action leaves a [`Notice`]
//! for the next render; the page itself is derived from [`Session::view`].

use std::path::PathBuf;
use std::sync::Arc;

use crate::assistant::{Assistant, AssistantError, AssistantFactory, StoragePath};
use crate::conversation::{ConversationEntry, ConversationStore};
use crate::core::config::CredentialInput;

pub mod view;

pub use view::{HistoryItem, Notice, SessionView};

const MISSING_KEY_WARNING: &str = "Please enter a valid OpenAI API key.";
const MISSING_EMBEDCHAIN_KEY_WARNING: &str =
    "EMBEDCHAIN_API_KEY is not set. Please enter an Embedchain API key.";
const EMPTY_PROMPT_WARNING: &str = "Please enter a prompt to get a response.";
const RESPONSE_SUCCESS: &str = "Response generated!";
const READY_SUCCESS: &str = "Assistant ready. Ask away!";
const LOCKED_CREDENTIALS_WARNING: &str =
    "Credentials are fixed for this session. Start a new session to change them.";

/// Per-session settings, built once at startup.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Keys read from the environment at process start.
    pub defaults: CredentialInput,
    /// Model selector choices. Cosmetic: never passed to the assistant.
    pub models: Vec<String>,
    /// Parent for storage paths; system temp dir when `None`.
    pub storage_root: Option<PathBuf>,
}

enum SessionState {
    Unauthenticated,
    Ready(Arc<dyn Assistant>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Ready,
    Incomplete,
    AlreadyReady,
    Failed(String),
}

#[derive(Debug)]
pub enum PromptOutcome {
    NotReady,
    Empty,
    Answered(ConversationEntry),
    Failed(AssistantError),
}

pub struct Session {
    factory: Arc<AssistantFactory>,
    config: Arc<SessionConfig>,
    credentials: CredentialInput,
    state: SessionState,
    conversation: ConversationStore,
    selected_model: String,
    latest_response: Option<String>,
    notice: Option<Notice>,
}

impl Session {
    pub fn new(factory: Arc<AssistantFactory>, config: Arc<SessionConfig>) -> Self {
        let selected_model = config.models.first().cloned().unwrap_or_default();
        Self {
            factory,
            credentials: config.defaults.clone(),
            config,
            state: SessionState::Unauthenticated,
            conversation: ConversationStore::new(),
            selected_model,
            latest_response: None,
            notice: None,
        }
    }

    /// Creates a session and, when the environment already supplies both
    /// keys, builds its assistant right away.
    pub async fn start(factory: Arc<AssistantFactory>, config: Arc<SessionConfig>) -> Self {
        let mut session = Self::new(factory, config);
        if session.credentials.complete().is_some() {
            session.authenticate().await;
        }
        session
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    pub fn conversation(&self) -> &ConversationStore {
        &self.conversation
    }

    pub fn selected_model(&self) -> &str {
        &self.selected_model
    }

    /// Accepts keys typed by the user. Blank fields fall back to the defaults.
    pub async fn submit_credentials(&mut self, submitted: CredentialInput) -> AuthOutcome {
        if self.is_ready() {
            self.notice = Some(Notice::Warning(LOCKED_CREDENTIALS_WARNING.to_string()));
            return AuthOutcome::AlreadyReady;
        }

        self.credentials = self.config.defaults.merged_with(&submitted);
        self.authenticate().await
    }

    async fn authenticate(&mut self) -> AuthOutcome {
        let Some(credentials) = self.credentials.complete() else {
            self.notice = Some(Notice::Warning(self.missing_credentials_message()));
            return AuthOutcome::Incomplete;
        };

        let storage = match &self.config.storage_root {
            Some(root) => StoragePath::create_in(root),
            None => StoragePath::create(),
        };
        let storage = match storage {
            Ok(storage) => storage,
            Err(err) => {
                let message = format!("Could not create a storage path: {}", err);
                tracing::error!("{}", message);
                self.notice = Some(Notice::Error(message.clone()));
                return AuthOutcome::Failed(message);
            }
        };

        match self.factory.build(storage, &credentials).await {
            Ok(assistant) => {
                self.state = SessionState::Ready(assistant);
                self.notice = Some(Notice::Success(READY_SUCCESS.to_string()));
                AuthOutcome::Ready
            }
            Err(err) => {
                let message = format!("Could not start the assistant: {}", err);
                self.notice = Some(Notice::Error(message.clone()));
                AuthOutcome::Failed(message)
            }
        }
    }

    fn missing_credentials_message(&self) -> String {
        if self.credentials.openai_api_key.is_some() && self.credentials.embedchain_api_key.is_none()
        {
            MISSING_EMBEDCHAIN_KEY_WARNING.to_string()
        } else {
            MISSING_KEY_WARNING.to_string()
        }
    }

    /// Records the model choice for display only.
    pub fn select_model(&mut self, model: &str) -> bool {
        let model = model.trim();
        if self.config.models.iter().any(|m| m == model) {
            self.selected_model = model.to_string();
            true
        } else {
            self.notice = Some(Notice::Warning(format!("Unknown model '{}'.", model)));
            false
        }
    }

    /// Forwards one prompt to the assistant. Blank prompts never reach it.
    pub async fn submit_prompt(&mut self, prompt: &str) -> PromptOutcome {
        let assistant = match &self.state {
            SessionState::Ready(assistant) => assistant.clone(),
            SessionState::Unauthenticated => {
                self.notice = Some(Notice::Warning(self.missing_credentials_message()));
                return PromptOutcome::NotReady;
            }
        };

        if prompt.trim().is_empty() {
            self.notice = Some(Notice::Warning(EMPTY_PROMPT_WARNING.to_string()));
            return PromptOutcome::Empty;
        }

        match assistant.chat(prompt).await {
            Ok(response) => {
                let entry = self.conversation.append(prompt, response).clone();
                self.latest_response = Some(entry.response.clone());
                self.notice = Some(Notice::Success(RESPONSE_SUCCESS.to_string()));
                tracing::debug!("Conversation now has {} entries", self.conversation.len());
                PromptOutcome::Answered(entry)
            }
            Err(err) => {
                tracing::warn!("Chat call failed: {}", err);
                self.notice = Some(Notice::Warning(err.to_string()));
                PromptOutcome::Failed(err)
            }
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            title: view::PAGE_TITLE,
            caption: view::PAGE_CAPTION,
            ready: self.is_ready(),
            has_default_openai_key: self.config.defaults.openai_api_key.is_some(),
            needs_embedchain_key: self.credentials.embedchain_api_key.is_none(),
            models: self.config.models.clone(),
            selected_model: self.selected_model.clone(),
            latest_response: self.latest_response.clone(),
            history: HistoryItem::numbered(self.conversation.all()),
            notice: self.notice.clone().or_else(|| self.standing_notice()),
        }
    }

    /// Shown on every render while the session has no assistant.
    fn standing_notice(&self) -> Option<Notice> {
        (!self.is_ready()).then(|| Notice::Warning(self.missing_credentials_message()))
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }
}
