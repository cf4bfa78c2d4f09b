//! HTTP request handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing, error boundary)
//!     → dispatcher.rs (lookup, 404/405, pipeline, abort handling)
//!     → context.rs (per-request state handed through the pipeline)
//!     → controller.rs (resolve + invoke the controller, render views)
//!     → Send to client
//! ```

pub mod context;
pub mod controller;
pub mod dispatcher;
pub mod server;

pub use context::{AbortHandle, RequestContext};
pub use controller::{
    ClassRef, ControllerOutput, ControllerRef, ControllerRegistry, ControllerResolver, ControllerResult,
    Handler, JsonViewRenderer, ViewElement, ViewRenderer,
};
pub use dispatcher::{DispatchOptions, Dispatcher, MatchedRoute, RouteMiss};
pub use server::HttpServer;
