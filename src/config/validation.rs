//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, distinct ports)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SpinnerConfig → Result<(), Vec<ValidationError>>

use std::net::IpAddr;

use crate::config::schema::{ListenerConfig, SpinnerConfig};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{listener}: invalid host {host:?}")]
    InvalidHost { listener: &'static str, host: String },
    #[error("{listener}: idle timeout must be positive")]
    ZeroIdleTimeout { listener: &'static str },
    #[error("public and management listeners share port {0}")]
    PortConflict(u16),
    #[error("{0} must be positive")]
    ZeroDuration(&'static str),
}

pub fn validate_config(config: &SpinnerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_listener("public", &config.public, &mut errors);
    validate_listener("management", &config.management, &mut errors);

    if config.public.port != 0 && config.public.port == config.management.port {
        errors.push(ValidationError::PortConflict(config.public.port));
    }
    if config.timeouts.read_ms == 0 {
        errors.push(ValidationError::ZeroDuration("timeouts.read_ms"));
    }
    if config.timeouts.write_ms == 0 {
        errors.push(ValidationError::ZeroDuration("timeouts.write_ms"));
    }
    if config.shutdown.deadline_ms == 0 {
        errors.push(ValidationError::ZeroDuration("shutdown.deadline_ms"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_listener(name: &'static str, listener: &ListenerConfig, errors: &mut Vec<ValidationError>) {
    if listener.host.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidHost {
            listener: name,
            host: listener.host.clone(),
        });
    }
    if listener.idle_timeout_secs == 0 {
        errors.push(ValidationError::ZeroIdleTimeout { listener: name });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&SpinnerConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = SpinnerConfig::default();
        config.public.host = "example.com".into();
        config.management.idle_timeout_secs = 0;
        config.timeouts.read_ms = 0;
        config.shutdown.deadline_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroDuration("shutdown.deadline_ms")));
        assert!(errors.contains(&ValidationError::ZeroIdleTimeout { listener: "management" }));
    }

    #[test]
    fn ephemeral_ports_may_repeat() {
        let mut config = SpinnerConfig::default();
        config.public.port = 0;
        config.management.port = 0;
        assert!(validate_config(&config).is_ok());
    }
}
