//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that paths and URLs have the shape the services expect
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ControllerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ControllerConfig;

/// A single semantic problem in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field}: '{value}' must start with '/'")]
    InvalidPath { field: &'static str, value: String },

    #[error("ingress.gateway.url: unsupported scheme '{0}'")]
    UnsupportedScheme(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ControllerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let server = &config.server;
    check_address(&mut errors, "server.listen_address", &server.listen_address);
    check_positive(&mut errors, "server.request_timeout_secs", server.request_timeout_secs);
    check_positive(&mut errors, "server.drain_timeout_secs", server.drain_timeout_secs);
    check_positive(&mut errors, "server.max_body_bytes", server.max_body_bytes as u64);
    if !server.health_path.starts_with('/') {
        errors.push(ValidationError::InvalidPath {
            field: "server.health_path",
            value: server.health_path.clone(),
        });
    }
    if let Some(tls) = &server.tls {
        check_non_empty(&mut errors, "server.tls.cert_path", &tls.cert_path);
        check_non_empty(&mut errors, "server.tls.key_path", &tls.key_path);
    }

    let ingress = &config.ingress;
    check_non_empty(&mut errors, "ingress.ingress_class", &ingress.ingress_class);
    check_non_empty(&mut errors, "ingress.cluster_domain", &ingress.cluster_domain);
    let scheme = ingress.gateway.url.scheme();
    if scheme != "http" && scheme != "https" {
        errors.push(ValidationError::UnsupportedScheme(scheme.to_string()));
    }
    check_positive(
        &mut errors,
        "ingress.gateway.request_timeout_secs",
        ingress.gateway.request_timeout_secs,
    );

    check_positive(&mut errors, "shutdown.timeout_secs", config.shutdown.timeout_secs);

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::NotPositive { field });
    }
}

fn check_non_empty(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::Empty { field });
    }
}
