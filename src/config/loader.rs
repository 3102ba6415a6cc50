//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::SpinnerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Port of the public API.
pub const PUBLIC_PORT_ENV: &str = "TIME_SERVER_PORT";
/// Port of the management API.
pub const MANAGEMENT_PORT_ENV: &str = "MGMT_SERVER_PORT";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value {value:?} for {name}")]
    Env { name: &'static str, value: String },
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: file (if any), then environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<SpinnerConfig, ConfigError> {
    let config = match path {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        None => SpinnerConfig::default(),
    };
    load_with_env(config, |name| std::env::var(name).ok())
}

/// Apply overrides looked up through `env`, then validate.
pub fn load_with_env<F>(mut config: SpinnerConfig, env: F) -> Result<SpinnerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = port_override(&env, PUBLIC_PORT_ENV)? {
        config.public.port = port;
    }
    if let Some(port) = port_override(&env, MANAGEMENT_PORT_ENV)? {
        config.management.port = port;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn port_override<F>(env: &F, name: &'static str) -> Result<Option<u16>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match env(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { name, value }),
    }
}
