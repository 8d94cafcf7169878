//! Configuration template materialization.
//!
//! Templates use `$`-placeholders: `${name}` or `$name` is replaced by a value,
//! `$$` is a literal `$`, and any other `$` is rejected. A template must use
//! exactly the names in [`Placeholder::ALL`]; each may appear more than once.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

static PLACEHOLDER_PATTERN: OnceLock<Regex> = OnceLock::new();

fn placeholder_pattern() -> &'static Regex {
    PLACEHOLDER_PATTERN.get_or_init(|| {
        Regex::new(
            r"\$(?:(?P<escaped>\$)|\{(?P<braced>[_A-Za-z][_A-Za-z0-9]*)\}|(?P<named>[_A-Za-z][_A-Za-z0-9]*)|(?P<invalid>))",
        )
        .expect("placeholder pattern is a valid regex")
    })
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("template uses unknown placeholder '${{{name}}}'")]
    UnknownPlaceholder { name: String },
    #[error("template is missing placeholder '${{{name}}}'")]
    MissingPlaceholder { name: &'static str },
    #[error("invalid placeholder in template: line {line}, col {column}")]
    InvalidPlaceholder { line: usize, column: usize },
    #[error("materialized template is not valid YAML: {0}")]
    InvalidYaml(#[source] serde_yaml::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Placeholder {
    DbPath,
    OpenaiApiKey,
    EmbedchainApiKey,
}

impl Placeholder {
    pub const ALL: [Placeholder; 3] = [
        Placeholder::DbPath,
        Placeholder::OpenaiApiKey,
        Placeholder::EmbedchainApiKey,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::DbPath => "db_path",
            Placeholder::OpenaiApiKey => "openai_api_key",
            Placeholder::EmbedchainApiKey => "embedchain_api_key",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// The three runtime values substituted into a template.
#[derive(Clone)]
pub struct TemplateValues {
    pub db_path: String,
    pub openai_api_key: String,
    pub embedchain_api_key: String,
}

impl TemplateValues {
    fn get(&self, placeholder: Placeholder) -> &str {
        match placeholder {
            Placeholder::DbPath => &self.db_path,
            Placeholder::OpenaiApiKey => &self.openai_api_key,
            Placeholder::EmbedchainApiKey => &self.embedchain_api_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Value(Placeholder),
}

/// A parsed template whose placeholder set has been checked.
#[derive(Debug, Clone)]
pub struct ConfigTemplate {
    segments: Vec<Segment>,
}

impl ConfigTemplate {
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let source = fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut seen = BTreeSet::new();
        let mut cursor = 0;

        for caps in placeholder_pattern().captures_iter(source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.start() > cursor {
                segments.push(Segment::Literal(source[cursor..whole.start()].to_string()));
            }
            cursor = whole.end();

            if caps.name("escaped").is_some() {
                segments.push(Segment::Literal("$".to_string()));
                continue;
            }

            let name = caps.name("braced").or_else(|| caps.name("named"));
            let Some(name) = name else {
                let (line, column) = line_and_column(source, whole.start());
                return Err(TemplateError::InvalidPlaceholder { line, column });
            };

            let placeholder = Placeholder::from_name(name.as_str()).ok_or_else(|| {
                TemplateError::UnknownPlaceholder {
                    name: name.as_str().to_string(),
                }
            })?;
            seen.insert(placeholder);
            segments.push(Segment::Value(placeholder));
        }

        if cursor < source.len() {
            segments.push(Segment::Literal(source[cursor..].to_string()));
        }

        if let Some(missing) = Placeholder::ALL.into_iter().find(|p| !seen.contains(p)) {
            return Err(TemplateError::MissingPlaceholder {
                name: missing.name(),
            });
        }

        Ok(Self { segments })
    }

    /// Literal substitution; values are inserted without escaping.
    pub fn render(&self, values: &TemplateValues) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Value(placeholder) => out.push_str(values.get(*placeholder)),
            }
        }
        out
    }
}

/// Renders the template at `template_path` into `output_path`, overwriting it.
///
/// The output is only written once rendering succeeded and the result parses as
/// YAML. Values are not escaped, so a key that breaks the document (`sk-a: b`,
/// `*alias`) is reported here as [`TemplateError::InvalidYaml`] rather than by
/// the assistant backend. `output_path` is shared by every caller; concurrent
/// callers race.
pub fn materialize(
    template_path: &Path,
    output_path: &Path,
    values: &TemplateValues,
) -> Result<PathBuf, TemplateError> {
    let template = ConfigTemplate::load(template_path)?;
    let rendered = template.render(values);
    serde_yaml::from_str::<serde_yaml::Value>(&rendered).map_err(TemplateError::InvalidYaml)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| TemplateError::Write {
                path: output_path.to_path_buf(),
                source,
            })?;
        }
    }
    fs::write(output_path, rendered).map_err(|source| TemplateError::Write {
        path: output_path.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        "Materialized {} into {}",
        template_path.display(),
        output_path.display()
    );
    Ok(output_path.to_path_buf())
}

fn line_and_column(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
