//! HTTP routing and middleware-composition engine.
//!
//! Declared routes (path pattern, methods, optional domain pattern,
//! controller, constraints, middleware) are compiled once at startup. For
//! every request the engine selects at most one route, validates its
//! captured parameters and runs an onion of middleware around the
//! controller.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod observability;
pub mod routing;

pub use config::schema::EngineConfig;
pub use error::{DispatchError, PatternError, RegistrationError};
pub use http::{Dispatcher, HttpServer, RequestContext};
pub use lifecycle::Shutdown;
pub use middleware::{Middleware, Next};
pub use routing::{Route, RouteGroup, Router};
