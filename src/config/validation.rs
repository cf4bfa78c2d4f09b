//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, log level, methods and constraint definitions
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - Names that depend on registries (middleware, controllers) and pattern
//!   syntax are checked when the router is built at startup

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::http::Method;
use regex::Regex;
use thiserror::Error;

use crate::config::schema::{ConstraintConfig, EngineConfig, GroupConfig, RouteConfig};
use crate::routing::constraint;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("observability.log_level: unknown level '{0}'")]
    InvalidLogLevel(String),

    #[error("middleware.timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("{route}: no HTTP methods")]
    NoMethods { route: String },

    #[error("{route}: invalid HTTP method '{method}'")]
    InvalidMethod { route: String, method: String },

    #[error("{route}: empty controller name")]
    EmptyController { route: String },

    #[error("{scope}.{param}: unknown built-in constraint '{name}'")]
    UnknownBuiltin { scope: String, param: String, name: String },

    #[error("{scope}.{param}: invalid regex: {message}")]
    InvalidRegex { scope: String, param: String, message: String },

    #[error("{scope}.{param}: one_of needs at least one value")]
    EmptyOneOf { scope: String, param: String },
}

/// Validate the whole configuration, collecting every error.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::InvalidLogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    if config.middleware.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    check_constraints("patterns", &config.patterns, &mut errors);
    for (i, route) in config.routes.iter().enumerate() {
        check_route(&format!("routes[{i}]"), route, &mut errors);
    }
    for (i, group) in config.groups.iter().enumerate() {
        check_group(&format!("groups[{i}]"), group, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_group(scope: &str, group: &GroupConfig, errors: &mut Vec<ValidationError>) {
    check_constraints(&format!("{scope}.where"), &group.constraints, errors);
    for (i, route) in group.routes.iter().enumerate() {
        check_route(&format!("{scope}.routes[{i}]"), route, errors);
    }
    for (i, child) in group.groups.iter().enumerate() {
        check_group(&format!("{scope}.groups[{i}]"), child, errors);
    }
}

fn check_route(scope: &str, route: &RouteConfig, errors: &mut Vec<ValidationError>) {
    let label = format!("{scope} '{}'", route.path);

    if route.methods.is_empty() {
        errors.push(ValidationError::NoMethods { route: label.clone() });
    }
    for method in &route.methods {
        if parse_method(method).is_none() {
            errors.push(ValidationError::InvalidMethod {
                route: label.clone(),
                method: method.clone(),
            });
        }
    }
    if route.controller.trim().is_empty() {
        errors.push(ValidationError::EmptyController { route: label });
    }
    check_constraints(&format!("{scope}.where"), &route.constraints, errors);
}

fn check_constraints(
    scope: &str,
    rules: &BTreeMap<String, ConstraintConfig>,
    errors: &mut Vec<ValidationError>,
) {
    for (param, rule) in rules {
        match rule {
            ConstraintConfig::Builtin { name } if !constraint::is_builtin(name) => {
                errors.push(ValidationError::UnknownBuiltin {
                    scope: scope.to_string(),
                    param: param.clone(),
                    name: name.clone(),
                });
            }
            ConstraintConfig::Regex { pattern } => {
                if let Err(e) = Regex::new(pattern) {
                    errors.push(ValidationError::InvalidRegex {
                        scope: scope.to_string(),
                        param: param.clone(),
                        message: e.to_string(),
                    });
                }
            }
            ConstraintConfig::OneOf { values } if values.is_empty() => {
                errors.push(ValidationError::EmptyOneOf {
                    scope: scope.to_string(),
                    param: param.clone(),
                });
            }
            _ => {}
        }
    }
}

/// Parse a configured method name, case-insensitively.
pub fn parse_method(name: &str) -> Option<Method> {
    let upper = name.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return None;
    }
    Method::from_bytes(upper.as_bytes()).ok()
}
