//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Dispatcher behaviour.
    pub dispatch: DispatchConfig,

    /// Middleware priority and built-in middleware settings.
    pub middleware: MiddlewareConfig,

    /// Global parameter patterns, applied to every route that captures the name.
    pub patterns: BTreeMap<String, ConstraintConfig>,

    /// Top-level routes.
    pub routes: Vec<RouteConfig>,

    /// Top-level groups, flattened after `routes`.
    pub groups: Vec<GroupConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DispatchConfig {
    /// Answer method mismatches with 405 + `Allow` instead of 404.
    pub method_not_allowed: bool,
}

/// Middleware configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Global priority order.
    pub priority: Vec<String>,

    /// Applied after `priority`, in order.
    pub insert_before: Vec<PriorityInsert>,

    /// Applied after `insert_before`, in order.
    pub insert_after: Vec<PriorityInsert>,

    /// Budget for the built-in `timeout` middleware.
    pub timeout_ms: u64,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            priority: Vec::new(),
            insert_before: Vec::new(),
            insert_after: Vec::new(),
            timeout_ms: 30_000,
        }
    }
}

/// `{ anchor, name }` entry for relative priority insertion.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PriorityInsert {
    pub anchor: String,
    pub name: String,
}

/// A parameter constraint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintConfig {
    /// Named built-in: numeric, alphanumeric, uuid, ulid.
    Builtin { name: String },
    /// User regex, anchored to the whole value.
    Regex { pattern: String },
    /// Enumerated literal set.
    OneOf { values: Vec<String> },
}

/// Route group.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GroupConfig {
    pub prefix: String,
    pub domain: Option<String>,
    pub name_prefix: String,
    pub middleware: Vec<String>,
    pub without_middleware: Vec<String>,
    #[serde(rename = "where")]
    pub constraints: BTreeMap<String, ConstraintConfig>,
    pub routes: Vec<RouteConfig>,
    pub groups: Vec<GroupConfig>,
}

/// Single route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    pub path: String,

    /// HTTP methods (default: GET).
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,

    /// Name looked up in the controller registry.
    pub controller: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub middleware: Vec<String>,

    #[serde(default)]
    pub without_middleware: Vec<String>,

    #[serde(default, rename = "where")]
    pub constraints: BTreeMap<String, ConstraintConfig>,

    /// Opaque data exposed to middleware and controllers.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

fn default_methods() -> Vec<String> {
    vec!["GET".to_string()]
}
