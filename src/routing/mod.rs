//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteGroup tree
//!     → group.rs (flatten prefixes, domains, middleware, where rules)
//!     → pattern.rs (compile path/domain patterns, score specificity)
//!     → router.rs (index per method, prebuild pipelines, freeze)
//!
//! Incoming Request (method, host, path):
//!     → router.rs (ordered candidate scan)
//!     → matcher.rs (domain AND path match, raw captures)
//!     → constraint.rs (route rules, then global patterns)
//!     → Return: Match or NoMatch (+ method mismatch flag)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Regex only inside mixed segments and constraints
//! - Deterministic: same input always matches same route

pub mod constraint;
pub mod group;
pub mod matcher;
pub mod params;
pub mod pattern;
pub mod route;
pub mod router;

pub use constraint::{Constraint, ConstraintSet, ParameterPatterns};
pub use group::{Node, Route, RouteGroup};
pub use params::Params;
pub use pattern::{CompiledPattern, Specificity};
pub use route::RouteDefinition;
pub use router::{Lookup, Match, Router};
