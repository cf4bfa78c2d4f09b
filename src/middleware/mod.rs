//! Middleware composition subsystem.
//!
//! # Data Flow
//! ```text
//! Route declaration (group + route middleware, withoutMiddleware)
//!     → set.rs (merge, subtract, share by identity)
//!     → priority.rs (move priority entries to the front, once per set)
//!     → pipeline.rs (frozen stack, run around the terminal endpoint)
//!
//! Request:
//!     stack[0].before → stack[1].before → ... → endpoint
//!     stack[0].after  ← stack[1].after  ← ... ←
//! ```
//!
//! # Design Decisions
//! - Sorting happens at registration, never on the request path
//! - A stage short-circuits by returning without calling `next`
//! - Identity of a middleware is its name

pub mod builtin;
pub mod pipeline;
pub mod priority;
pub mod registry;
pub mod set;

use std::future::Future;
use std::sync::Arc;

use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::error::DispatchError;
use crate::http::context::RequestContext;

pub use pipeline::Pipeline;
pub use priority::{PriorityBuilder, PriorityList};
pub use registry::MiddlewareRegistry;
pub use set::MiddlewareSet;

/// Result of every stage in the chain.
pub type RouteResult = Result<Response, DispatchError>;

/// Shared reference to a middleware.
pub type MiddlewareRef = Arc<dyn Middleware>;

/// A request-processing stage wrapped around the controller.
pub trait Middleware: Send + Sync {
    /// Stable name used for priority ordering and removal.
    fn name(&self) -> &str;

    fn handle<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, RouteResult>;
}

impl std::fmt::Debug for dyn Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Middleware({})", self.name())
    }
}

/// The innermost stage: resolves and runs the controller.
pub trait Endpoint: Send + Sync {
    fn call(&self, ctx: RequestContext) -> BoxFuture<'_, RouteResult>;
}

/// Continuation to the rest of the chain.
pub struct Next<'a> {
    stack: &'a [MiddlewareRef],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub fn new(stack: &'a [MiddlewareRef], endpoint: &'a dyn Endpoint) -> Self {
        Self { stack, endpoint }
    }

    /// Run the remaining stages with `ctx`.
    pub async fn run(self, ctx: RequestContext) -> RouteResult {
        match self.stack.split_first() {
            Some((current, rest)) => {
                current
                    .handle(
                        ctx,
                        Next {
                            stack: rest,
                            endpoint: self.endpoint,
                        },
                    )
                    .await
            }
            None => self.endpoint.call(ctx).await,
        }
    }
}

/// Middleware built from a closure.
pub struct FnMiddleware<F> {
    name: String,
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(RequestContext, Next<'a>) -> BoxFuture<'a, RouteResult> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, RouteResult> {
        (self.f)(ctx, next)
    }
}

/// Wrap a closure as a named middleware.
///
/// ```ignore
/// let tag = from_fn("tag", |ctx, next| Box::pin(async move {
///     let mut res = next.run(ctx).await?;
///     res.headers_mut().insert("x-tag", "1".parse().unwrap());
///     Ok(res)
/// }));
/// ```
pub fn from_fn<F>(name: impl Into<String>, f: F) -> MiddlewareRef
where
    F: for<'a> Fn(RequestContext, Next<'a>) -> BoxFuture<'a, RouteResult> + Send + Sync + 'static,
{
    Arc::new(FnMiddleware { name: name.into(), f })
}

/// Endpoint built from an async closure. Mostly useful in tests.
pub struct FnEndpoint<F>(pub F);

impl<F, Fut> Endpoint for FnEndpoint<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = RouteResult> + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> BoxFuture<'_, RouteResult> {
        Box::pin((self.0)(ctx))
    }
}
