//! Built-in middleware.
//!
//! - `request_id`: ensures an `x-request-id` on the request and echoes it
//!   on the response
//! - `request_logging`: one structured log line per completed request
//! - `timeout`: aborts with 504 when the rest of the chain is too slow

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode},
    response::Response,
};
use futures_util::future::BoxFuture;

use crate::http::context::RequestContext;
use crate::middleware::{Middleware, MiddlewareRef, Next, RouteResult};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Passes straight through. Useful as a named placeholder.
#[derive(Debug, Clone)]
pub struct Noop {
    name: String,
}

impl Noop {
    pub fn named(name: &str) -> MiddlewareRef {
        Arc::new(Noop {
            name: name.to_string(),
        })
    }
}

impl Middleware for Noop {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, RouteResult> {
        Box::pin(next.run(ctx))
    }
}

/// Assigns a UUID v4 request id unless the client sent one.
#[derive(Debug, Clone, Default)]
pub struct RequestId;

impl Middleware for RequestId {
    fn name(&self) -> &str {
        "request_id"
    }

    fn handle<'a>(&'a self, mut ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, RouteResult> {
        Box::pin(async move {
            let id = match ctx.headers().get(X_REQUEST_ID) {
                Some(existing) => existing.clone(),
                None => {
                    let generated = HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
                        .map_err(crate::error::DispatchError::handler)?;
                    ctx.headers_mut().insert(X_REQUEST_ID, generated.clone());
                    generated
                }
            };

            let mut response = next.run(ctx).await?;
            response.headers_mut().insert(X_REQUEST_ID, id);
            Ok(response)
        })
    }
}

/// Logs method, path, status and elapsed time.
#[derive(Debug, Clone, Default)]
pub struct RequestLogging;

impl Middleware for RequestLogging {
    fn name(&self) -> &str {
        "request_logging"
    }

    fn handle<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, RouteResult> {
        Box::pin(async move {
            let method = ctx.method().clone();
            let path = ctx.url().path().to_string();
            let route = ctx.route().path().to_string();
            let start = Instant::now();

            let result = next.run(ctx).await;

            match &result {
                Ok(response) => tracing::info!(
                    method = %method,
                    path = %path,
                    route = %route,
                    status = response.status().as_u16(),
                    elapsed = ?start.elapsed(),
                    "Request completed"
                ),
                Err(e) => tracing::info!(
                    method = %method,
                    path = %path,
                    route = %route,
                    error = %e,
                    elapsed = ?start.elapsed(),
                    "Request failed"
                ),
            }
            result
        })
    }
}

/// Bounds the time spent in the rest of the chain.
#[derive(Debug, Clone)]
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Middleware for Timeout {
    fn name(&self) -> &str {
        "timeout"
    }

    fn handle<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, RouteResult> {
        Box::pin(async move {
            let abort = ctx.abort_handle();
            match tokio::time::timeout(self.duration, next.run(ctx)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(timeout = ?self.duration, "Request timed out");
                    let mut response = Response::new(Body::from("Request timed out"));
                    *response.status_mut() = StatusCode::GATEWAY_TIMEOUT;
                    Err(abort.abort(response))
                }
            }
        })
    }
}
