//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks, all errors at once)
//!     → EngineConfig (validated, immutable)
//!     → lifecycle::startup (build routes, router, dispatcher)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ConstraintConfig, DispatchConfig, EngineConfig, GroupConfig, ListenerConfig, MiddlewareConfig,
    ObservabilityConfig, PriorityInsert, RouteConfig,
};
pub use validation::{validate_config, ValidationError};
