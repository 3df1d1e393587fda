//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::plugin::PluginData;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Plugin data error: {0}")]
    PluginData(#[from] serde_json::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load the plugin data records the local control-plane file holds.
pub fn load_plugin_data(path: &Path) -> Result<Vec<PluginData>, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_valid_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[upstream]\naddress = \"127.0.0.1:3000\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.upstream.address, "127.0.0.1:3000");
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nttl_secs = 0\nmax_body_bytes = 0").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: cache.ttl_secs must be greater than zero, \
             cache.max_body_bytes must be greater than zero"
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/gateway.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_plugin_data() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name":"cache","enabled":true,"config":"{{\"cacheType\":\"memory\"}}"}}]"#
        )
        .unwrap();

        let records = load_plugin_data(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "cache");
        assert!(records[0].enabled);
        assert_eq!(records[0].config.as_deref(), Some(r#"{"cacheType":"memory"}"#));
    }
}
