//! Boundary to the retrieval-augmented assistant.
//!
//! Retrieval, embedding and model calls all live behind [`Assistant`]; this
//! crate only builds instances from a generated configuration file and forwards
//! prompts to them.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub mod factory;
pub mod remote;

pub use factory::{AssistantFactory, BuildError, StoragePath};
pub use remote::RemoteBackend;

#[derive(Debug, Error)]
pub enum AssistantError {
    /// Invalid credentials or a malformed generated configuration.
    #[error("failed to construct assistant: {0}")]
    Construction(String),
    /// A single `chat` call failed; the assistant stays usable.
    #[error("assistant request failed: {0}")]
    Invocation(String),
}

#[async_trait]
pub trait Assistant: Send + Sync {
    /// Answers one prompt. May block for as long as the backend takes.
    async fn chat(&self, prompt: &str) -> Result<String, AssistantError>;
}

#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// backend name for logs (e.g. "remote")
    fn name(&self) -> &str;

    /// build an assistant from a generated configuration file
    async fn from_config(&self, config_path: &Path) -> Result<Arc<dyn Assistant>, AssistantError>;
}
