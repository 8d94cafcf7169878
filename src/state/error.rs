use thiserror::Error;

use crate::template::TemplateError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration template: {0}")]
    Template(#[source] TemplateError),

    #[error("Failed to prepare page templates: {0}")]
    Pages(#[source] minijinja::Error),
}
