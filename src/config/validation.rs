//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Validate paths and extensions used by the route builder
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TreelineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::schema::TreelineConfig;

/// One failed check: the offending field and what is wrong with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &TreelineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            "must be greater than 0",
        ));
    }

    if config.routes.app_dir.as_os_str().is_empty() {
        errors.push(ValidationError::new("routes.app_dir", "must not be empty"));
    }
    if config.routes.extensions.is_empty() {
        errors.push(ValidationError::new(
            "routes.extensions",
            "at least one extension is required",
        ));
    }
    for ext in &config.routes.extensions {
        if ext.is_empty() || ext.starts_with('.') || ext.contains('/') {
            errors.push(ValidationError::new(
                "routes.extensions",
                format!("'{}' must be a bare extension like \"html\"", ext),
            ));
        }
    }

    if !config.render.asset_prefix.starts_with('/') {
        errors.push(ValidationError::new(
            "render.asset_prefix",
            "must be an absolute URL path",
        ));
    }
    if let Some(entry) = &config.render.client_entry {
        if entry.trim().is_empty() {
            errors.push(ValidationError::new("render.client_entry", "must not be empty"));
        }
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("'{}' is not a valid filter", config.observability.log_level),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
