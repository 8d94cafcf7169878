use std::collections::HashSet;
use std::path::Path;

use super::service::AppConfig;
use super::ConfigError;

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_non_empty_string("server.host", &config.server.host)?;
    if config.server.host.chars().any(char::is_whitespace) {
        return Err(invalid("server.host", "must not contain whitespace"));
    }

    validate_non_empty_path("assistant.template_path", &config.assistant.template_path)?;
    validate_non_empty_path("assistant.output_path", &config.assistant.output_path)?;
    if let Some(root) = &config.assistant.storage_root {
        validate_non_empty_path("assistant.storage_root", root)?;
    }

    validate_models(&config.assistant.models)?;

    validate_non_empty_string("logging.filter", &config.logging.filter)?;
    validate_non_empty_string("logging.file_name", &config.logging.file_name)?;
    if config.logging.file_name.contains(['/', '\\']) {
        return Err(invalid("logging.file_name", "must be a file name, not a path"));
    }
    Ok(())
}

fn validate_models(models: &[String]) -> Result<(), ConfigError> {
    if models.is_empty() {
        return Err(invalid("assistant.models", "at least one model is required"));
    }

    let mut seen = HashSet::new();
    for (index, model) in models.iter().enumerate() {
        let path = format!("assistant.models[{}]", index);
        validate_non_empty_string(&path, model)?;
        if !seen.insert(model.trim()) {
            return Err(invalid(&path, &format!("duplicate model '{}'", model)));
        }
    }
    Ok(())
}

fn validate_non_empty_string(path: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(path, "value cannot be empty"));
    }
    Ok(())
}

fn validate_non_empty_path(path: &str, value: &Path) -> Result<(), ConfigError> {
    if value.as_os_str().is_empty() {
        return Err(invalid(path, "path cannot be empty"));
    }
    Ok(())
}

fn invalid(path: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn invalid_path(result: Result<(), ConfigError>) -> String {
        match result {
            Err(ConfigError::Invalid { path, .. }) => path,
            other => panic!("expected invalid config, got {:?}", other),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn rejects_blank_host() {
        let mut config = AppConfig::default();
        config.server.host = "  ".to_string();

        assert_eq!(invalid_path(validate_config(&config)), "server.host");
    }

    #[test]
    fn rejects_empty_and_duplicate_models() {
        let mut config = AppConfig::default();
        config.assistant.models.clear();
        assert_eq!(invalid_path(validate_config(&config)), "assistant.models");

        config.assistant.models = vec!["gpt-3.5-turbo".into(), "".into()];
        assert_eq!(invalid_path(validate_config(&config)), "assistant.models[1]");

        config.assistant.models = vec!["a".into(), "b".into(), "a".into()];
        assert_eq!(invalid_path(validate_config(&config)), "assistant.models[2]");
    }

    #[test]
    fn rejects_log_file_with_directory() {
        let mut config = AppConfig::default();
        config.logging.file_name = "logs/embedchat.log".to_string();

        assert_eq!(invalid_path(validate_config(&config)), "logging.file_name");
    }

    #[test]
    fn rejects_empty_paths() {
        let mut config = AppConfig::default();
        config.assistant.output_path = PathBuf::new();

        assert_eq!(
            invalid_path(validate_config(&config)),
            "assistant.output_path"
        );
    }
}
