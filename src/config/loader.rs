//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::ControllerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ControllerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ControllerConfig, ConfigError> {
    let config: ControllerConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [server]
        listen_address = "127.0.0.1:8443"

        [injector]
        [[injector.containers]]
        name = "gateway"
        image = "gateway:latest"
    "#;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.server.listen_address, "127.0.0.1:8443");
        assert_eq!(config.server.health_path, "/healthz");
        assert_eq!(config.injector.containers.len(), 1);
        assert_eq!(config.injector.containers[0].image.as_deref(), Some("gateway:latest"));
        assert_eq!(config.ingress.ingress_class, "gateway");
        assert_eq!(config.shutdown.timeout_secs, 30);
    }

    #[test]
    fn test_missing_server_section_is_rejected() {
        let err = parse_config("[injector]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("server"));
    }

    #[test]
    fn test_missing_injector_section_is_rejected() {
        let err = parse_config("[server]\n").unwrap_err();
        assert!(err.to_string().contains("injector"));
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let content = MINIMAL.replace("127.0.0.1:8443", "bogus") + "\n[shutdown]\ntimeout_secs = 0\n";
        match parse_config(&content) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.injector.containers[0].name, "gateway");

        let missing = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
