use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use thiserror::Error;

use super::{Assistant, AssistantBackend, AssistantError};
use crate::core::config::Credentials;
use crate::template::{self, TemplateError, TemplateValues};

const STORAGE_PREFIX: &str = "embedchat-db-";

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Assistant(#[from] AssistantError),
}

/// Fresh working directory for one assistant construction.
///
/// Handing it to [`AssistantFactory::build`] moves it, so nothing can refer to
/// it after the build. Dropping it removes the directory as well.
#[derive(Debug)]
pub struct StoragePath {
    dir: TempDir,
}

impl StoragePath {
    pub fn create() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(STORAGE_PREFIX).tempdir()?;
        Ok(Self { dir })
    }

    pub fn create_in(root: &Path) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(STORAGE_PREFIX)
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn remove(self) -> io::Result<()> {
        self.dir.close()
    }
}

pub struct AssistantFactory {
    template_path: PathBuf,
    output_path: PathBuf,
    backend: Arc<dyn AssistantBackend>,
}

impl AssistantFactory {
    pub fn new(
        template_path: PathBuf,
        output_path: PathBuf,
        backend: Arc<dyn AssistantBackend>,
    ) -> Self {
        Self {
            template_path,
            output_path,
            backend,
        }
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Materializes the configuration and constructs an assistant from it.
    ///
    /// The storage path is removed afterwards whatever the outcome; a failed
    /// removal is logged and otherwise ignored.
    pub async fn build(
        &self,
        storage: StoragePath,
        credentials: &Credentials,
    ) -> Result<Arc<dyn Assistant>, BuildError> {
        let storage_dir = storage.path().to_path_buf();
        let result = self.construct(&storage_dir, credentials).await;

        match storage.remove() {
            Ok(()) => tracing::debug!("Removed storage path {}", storage_dir.display()),
            Err(err) => tracing::warn!(
                "Failed to remove storage path {}: {}",
                storage_dir.display(),
                err
            ),
        }

        match &result {
            Ok(_) => tracing::info!("Assistant ready (backend: {})", self.backend.name()),
            Err(err) => tracing::error!("Assistant build failed: {}", err),
        }
        result
    }

    async fn construct(
        &self,
        storage_dir: &Path,
        credentials: &Credentials,
    ) -> Result<Arc<dyn Assistant>, BuildError> {
        let values = TemplateValues {
            db_path: storage_dir.to_string_lossy().to_string(),
            openai_api_key: credentials.openai_api_key().to_string(),
            embedchain_api_key: credentials.embedchain_api_key().to_string(),
        };
        let config_path = template::materialize(&self.template_path, &self.output_path, &values)?;
        let assistant = self.backend.from_config(&config_path).await?;
        Ok(assistant)
    }
}
