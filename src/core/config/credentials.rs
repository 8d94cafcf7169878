use std::env;
use std::fmt;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const EMBEDCHAIN_API_KEY_ENV: &str = "EMBEDCHAIN_API_KEY";

const REDACT_PLACEHOLDER: &str = "****";

/// Possibly incomplete credentials, as collected from the environment or a form.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialInput {
    pub openai_api_key: Option<String>,
    pub embedchain_api_key: Option<String>,
}

/// Both keys present and non-blank.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    openai_api_key: String,
    embedchain_api_key: String,
}

impl CredentialInput {
    pub fn new(openai_api_key: Option<String>, embedchain_api_key: Option<String>) -> Self {
        Self {
            openai_api_key: non_blank(openai_api_key),
            embedchain_api_key: non_blank(embedchain_api_key),
        }
    }

    /// Reads both keys once; called at process start.
    pub fn from_env() -> Self {
        Self::new(
            env::var(OPENAI_API_KEY_ENV).ok(),
            env::var(EMBEDCHAIN_API_KEY_ENV).ok(),
        )
    }

    /// Values present in `other` win over the ones in `self`.
    pub fn merged_with(&self, other: &CredentialInput) -> CredentialInput {
        CredentialInput {
            openai_api_key: other
                .openai_api_key
                .clone()
                .or_else(|| self.openai_api_key.clone()),
            embedchain_api_key: other
                .embedchain_api_key
                .clone()
                .or_else(|| self.embedchain_api_key.clone()),
        }
    }

    pub fn complete(&self) -> Option<Credentials> {
        match (&self.openai_api_key, &self.embedchain_api_key) {
            (Some(openai), Some(embedchain)) => Some(Credentials {
                openai_api_key: openai.clone(),
                embedchain_api_key: embedchain.clone(),
            }),
            _ => None,
        }
    }
}

impl Credentials {
    pub fn openai_api_key(&self) -> &str {
        &self.openai_api_key
    }

    pub fn embedchain_api_key(&self) -> &str {
        &self.embedchain_api_key
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn redacted(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => REDACT_PLACEHOLDER,
        None => "<unset>",
    }
}

impl fmt::Debug for CredentialInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialInput")
            .field("openai_api_key", &redacted(&self.openai_api_key))
            .field("embedchain_api_key", &redacted(&self.embedchain_api_key))
            .finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &REDACT_PLACEHOLDER)
            .field("embedchain_api_key", &REDACT_PLACEHOLDER)
            .finish()
    }
}
