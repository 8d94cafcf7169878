use std::path::PathBuf;

use thiserror::Error;

pub mod credentials;
pub mod paths;
pub mod service;
pub mod validation;

pub use credentials::{CredentialInput, Credentials};
pub use paths::AppPaths;
pub use service::{AppConfig, AssistantSection, ConfigService, LoggingSection, ServerSection};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config at '{path}': {reason}")]
    Invalid { path: String, reason: String },
}
