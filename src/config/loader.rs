//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{AppConfig, ServerConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding the listen port.
pub const PORT_VAR: &str = "PORT";
/// Environment variable overriding the listen host.
pub const HOST_VAR: &str = "HOST";
/// Environment variable overriding the environment name.
pub const ENV_VAR: &str = "PIPEWORK_ENV";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {var}")]
    Env { var: &'static str, value: String },

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
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `PORT`, `HOST` and `PIPEWORK_ENV` from the process environment.
pub fn apply_env_overrides(config: &mut AppConfig) -> Result<(), ConfigError> {
    apply_overrides(config, |var| std::env::var(var).ok())
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Unset or empty variables leave the config untouched.
pub fn apply_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |var: &str| lookup(var).filter(|v| !v.is_empty());

    if let Some(port) = get(PORT_VAR) {
        config.server.port = port.parse().map_err(|_| ConfigError::Env {
            var: PORT_VAR,
            value: port.clone(),
        })?;
    }
    if let Some(host) = get(HOST_VAR) {
        config.server.host = host;
    }
    if let Some(env) = get(ENV_VAR) {
        config.environment = env;
    }
    Ok(())
}

/// Listener settings from the environment alone.
pub fn server_from_env() -> Result<ServerConfig, ConfigError> {
    let mut config = AppConfig::default();
    apply_env_overrides(&mut config)?;
    Ok(config.server)
}
