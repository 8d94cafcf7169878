use std::sync::Arc;

use tokio::sync::Mutex;

use crate::assistant::{AssistantBackend, AssistantFactory, RemoteBackend};
use crate::core::config::{AppConfig, AppPaths, CredentialInput};
use crate::server::page::PageRenderer;
use crate::session::{Session, SessionConfig};
use crate::template::ConfigTemplate;

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// There is one live [`Session`]; its mutex serializes interactions, so a slow
/// `chat` call holds up the next request until it returns.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<AppConfig>,
    pub pages: PageRenderer,
    pub session: Mutex<Session>,
    factory: Arc<AssistantFactory>,
    session_config: Arc<SessionConfig>,
}

impl AppState {
    /// Reads the API keys from the environment and starts the first session
    /// against the remote backend.
    pub async fn initialize(
        paths: Arc<AppPaths>,
        config: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        Self::build(
            paths,
            config,
            CredentialInput::from_env(),
            Arc::new(RemoteBackend::new()),
        )
        .await
    }

    /// `config` must already have its paths resolved.
    pub async fn build(
        paths: Arc<AppPaths>,
        config: AppConfig,
        defaults: CredentialInput,
        backend: Arc<dyn AssistantBackend>,
    ) -> Result<Arc<Self>, InitializationError> {
        let assistant = &config.assistant;

        // A broken template is a startup failure, not a per-session one.
        ConfigTemplate::load(&assistant.template_path).map_err(InitializationError::Template)?;

        let pages = PageRenderer::new().map_err(InitializationError::Pages)?;
        let factory = Arc::new(AssistantFactory::new(
            assistant.template_path.clone(),
            assistant.output_path.clone(),
            backend,
        ));
        let session_config = Arc::new(SessionConfig {
            defaults,
            models: assistant.models.clone(),
            storage_root: assistant.storage_root.clone(),
        });

        tracing::info!(
            "Template: {}, generated config: {}, credentials: {:?}",
            factory.template_path().display(),
            factory.output_path().display(),
            session_config.defaults
        );

        let session = Session::start(factory.clone(), session_config.clone()).await;

        Ok(Arc::new(AppState {
            paths,
            config: Arc::new(config),
            pages,
            session: Mutex::new(session),
            factory,
            session_config,
        }))
    }

    /// Discards the current session, conversation included, and starts a new one.
    pub async fn reset_session(&self) {
        let fresh = Session::start(self.factory.clone(), self.session_config.clone()).await;
        *self.session.lock().await = fresh;
        tracing::info!("Started a new session");
    }
}
