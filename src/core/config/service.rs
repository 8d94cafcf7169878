use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::paths::AppPaths;
use super::validation::validate_config;
use super::ConfigError;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8501;
const DEFAULT_TEMPLATE_PATH: &str = "templates/gpt-3.5-turbo.template.yaml";
const DEFAULT_OUTPUT_PATH: &str = "gpt-3.5-turbo.yaml";
const DEFAULT_MODELS: [&str; 3] = ["gpt-3.5-turbo", "text-davinci-003", "code-davinci-003"];
const DEFAULT_LOG_FILTER: &str = "info,embedchat=debug";
const DEFAULT_LOG_FILE: &str = "embedchat.log";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub assistant: AssistantSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSection {
    /// Configuration template read on every assistant build.
    pub template_path: PathBuf,
    /// Fixed destination of the generated configuration. Overwritten per build.
    pub output_path: PathBuf,
    /// Parent directory for per-session storage paths. System temp dir when unset.
    pub storage_root: Option<PathBuf>,
    /// Choices offered by the model selector.
    pub models: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
    /// Prefix of the daily log files under the log dir.
    pub file_name: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            file_name: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for AssistantSection {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            storage_root: None,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl AppConfig {
    /// Rewrites relative paths into absolute ones against `paths`.
    pub fn resolve_paths(mut self, paths: &AppPaths) -> Self {
        self.assistant.template_path = paths.resolve_project_path(&self.assistant.template_path);
        self.assistant.output_path = paths.resolve_data_path(&self.assistant.output_path);
        self.assistant.storage_root = self
            .assistant
            .storage_root
            .map(|root| paths.resolve_data_path(&root));
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("EMBEDCHAT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// Loads `config.yml`, applies environment overrides, validates, and
    /// resolves relative paths. A missing file yields the defaults.
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let path = self.config_path();
        let mut config = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            parse_config(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            tracing::info!("No config file at {}, using defaults", path.display());
            AppConfig::default()
        };

        apply_port_override(&mut config, env::var("PORT").ok().as_deref());
        validate_config(&config)?;
        Ok(config.resolve_paths(&self.paths))
    }
}

fn parse_config(contents: &str) -> Result<AppConfig, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(contents)
}

fn apply_port_override(config: &mut AppConfig, raw: Option<&str>) {
    let Some(raw) = raw else {
        return;
    };
    match raw.trim().parse::<u16>() {
        Ok(port) => config.server.port = port,
        Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config = parse_config("server:\n  port: 9000\n").expect("parse");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.assistant, AssistantSection::default());
        assert_eq!(config.logging, LoggingSection::default());
    }

    #[test]
    fn logging_section_overrides_defaults() {
        let config =
            parse_config("logging:\n  filter: warn\n").expect("parse");

        assert_eq!(config.logging.filter, "warn");
        assert_eq!(config.logging.file_name, DEFAULT_LOG_FILE);
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(parse_config("  \n").expect("parse"), AppConfig::default());
    }

    #[test]
    fn port_override_ignores_garbage() {
        let mut config = AppConfig::default();

        apply_port_override(&mut config, Some("not-a-port"));
        assert_eq!(config.server.port, DEFAULT_PORT);

        apply_port_override(&mut config, Some(" 8080 "));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn resolve_paths_anchors_template_and_output() {
        let root = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::with_roots(root.path().join("project"), root.path().join("data"));
        let mut config = AppConfig::default();
        config.assistant.storage_root = Some(PathBuf::from("storage"));

        let resolved = config.resolve_paths(&paths);

        assert_eq!(
            resolved.assistant.template_path,
            root.path().join("project").join(DEFAULT_TEMPLATE_PATH)
        );
        assert_eq!(
            resolved.assistant.output_path,
            root.path().join("data").join(DEFAULT_OUTPUT_PATH)
        );
        assert_eq!(
            resolved.assistant.storage_root,
            Some(root.path().join("data").join("storage"))
        );
    }

    #[test]
    fn load_config_reads_user_config_file() {
        if env::var("EMBEDCHAT_CONFIG_PATH").is_ok() || env::var("PORT").is_ok() {
            return;
        }
        let root = tempfile::tempdir().expect("tempdir");
        let paths = Arc::new(AppPaths::with_roots(
            root.path().join("project"),
            root.path().join("data"),
        ));
        fs::write(
            paths.user_data_dir.join("config.yml"),
            "assistant:\n  models: [a, b]\n",
        )
        .expect("write config");

        let service = ConfigService::new(paths);
        let config = service.load_config().expect("load");

        assert_eq!(config.assistant.models, vec!["a", "b"]);
    }
}
