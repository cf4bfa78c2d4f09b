//! Request dispatch.
//!
//! # Responsibilities
//! - Look the request up in the router
//! - Render no-match as 404 (or 405 with `Allow` when configured)
//! - Build the request context and run the route's prebuilt pipeline
//! - Resolve and invoke the controller at the end of the chain
//! - Swap an abort for the response it recorded
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → host (Host header, else URI authority) + path
//!     → Router::lookup
//!     → RequestContext (decoded + raw params, URL, route)
//!     → Pipeline::run(ctx, ControllerEndpoint)
//!     → Response | abort response | DispatchError
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::Response,
};
use futures_util::future::BoxFuture;
use url::Url;

use crate::error::DispatchError;
use crate::http::context::RequestContext;
use crate::http::controller::{
    ControllerOutput, ControllerRef, ControllerResolver, JsonViewRenderer, ViewRenderer,
};
use crate::middleware::{Endpoint, RouteResult};
use crate::observability::metrics;
use crate::routing::router::Router;

/// Dispatcher behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Answer method mismatches with 405 and an `Allow` header instead of 404.
    pub method_not_allowed: bool,
}

/// Response extension set on 404/405 responses produced by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMiss {
    pub method_mismatch: bool,
}

/// Response extension naming the route that produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute {
    pub path: String,
    pub name: Option<String>,
}

/// Entry point for every request.
pub struct Dispatcher {
    router: Arc<Router>,
    resolver: Arc<dyn ControllerResolver>,
    renderer: Arc<dyn ViewRenderer>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(router: Arc<Router>, resolver: Arc<dyn ControllerResolver>) -> Self {
        Self {
            router,
            resolver,
            renderer: Arc::new(JsonViewRenderer),
            options: DispatchOptions::default(),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ViewRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Handle one request.
    ///
    /// Returns `Err` only for request-time fatal conditions; no-match and
    /// aborts both yield `Ok`.
    pub async fn handle(&self, request: Request<Body>) -> Result<Response, DispatchError> {
        let method = request.method().clone();
        let host = request_host(&request);
        let path = request.uri().path().to_string();

        let lookup = self.router.lookup(&method, &host, &path)?;
        let Some(matched) = lookup.matched else {
            tracing::debug!(
                method = %method,
                host = %host,
                path = %path,
                method_mismatch = lookup.method_mismatch,
                "No route matched"
            );
            return Ok(self.not_found(&method, &host, &path, lookup.method_mismatch));
        };

        let url = request_url(&request, &host).map_err(DispatchError::handler)?;
        let route = Arc::clone(&matched.route);
        let ctx = RequestContext::new(request, matched.params, url, Arc::clone(&route));
        let abort = ctx.abort_handle();

        let endpoint = ControllerEndpoint {
            resolver: self.resolver.as_ref(),
            renderer: self.renderer.as_ref(),
        };

        let result = matched.pipeline.run(ctx, &endpoint).await;

        // An abort wins over whatever the chain returned afterwards.
        let mut response = match abort.take() {
            Some(response) => {
                tracing::debug!(
                    path = %path,
                    route = %route.path(),
                    status = response.status().as_u16(),
                    "Request aborted"
                );
                metrics::record_abort(route.path());
                response
            }
            None => match result {
                Ok(response) => response,
                Err(DispatchError::Aborted) => {
                    // a stage took the abort response out of the slot itself
                    tracing::warn!(path = %path, "Abort signalled without a response");
                    empty(StatusCode::INTERNAL_SERVER_ERROR)
                }
                Err(err) => {
                    tracing::error!(
                        method = %method,
                        path = %path,
                        route = %route.path(),
                        error = %err,
                        "Request failed"
                    );
                    return Err(err);
                }
            },
        };

        response.extensions_mut().insert(MatchedRoute {
            path: route.path().to_string(),
            name: route.name().map(str::to_string),
        });
        Ok(response)
    }

    fn not_found(&self, method: &Method, host: &str, path: &str, method_mismatch: bool) -> Response {
        let mut response = if method_mismatch && self.options.method_not_allowed {
            let allowed = self.router.allowed_methods(method, host, path);
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            let mut response = empty(StatusCode::METHOD_NOT_ALLOWED);
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
            response
        } else {
            empty(StatusCode::NOT_FOUND)
        };
        response.extensions_mut().insert(RouteMiss { method_mismatch });
        response
    }
}

/// Terminal stage: resolve the controller, invoke it, render its output.
struct ControllerEndpoint<'d> {
    resolver: &'d dyn ControllerResolver,
    renderer: &'d dyn ViewRenderer,
}

impl Endpoint for ControllerEndpoint<'_> {
    fn call(&self, ctx: RequestContext) -> BoxFuture<'_, RouteResult> {
        Box::pin(async move {
            let handler = match ctx.route().controller() {
                ControllerRef::Callable(handler) => Arc::clone(handler),
                ControllerRef::Class(class) => {
                    if !class.is_injectable() {
                        return Err(DispatchError::UnmarkedController(class.name().to_string()));
                    }
                    self.resolver
                        .resolve(class)
                        .ok_or_else(|| DispatchError::UnresolvedController(class.name().to_string()))?
                }
            };

            match handler.call(ctx).await? {
                ControllerOutput::Response(response) => Ok(response),
                ControllerOutput::View(view) => self.renderer.render(view),
                ControllerOutput::Empty => Ok(empty(StatusCode::NO_CONTENT)),
            }
        })
    }
}

/// Hostname from the `Host` header, falling back to the URI authority.
fn request_host(request: &Request<Body>) -> String {
    request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.as_str().to_string()))
        .unwrap_or_default()
}

/// Absolute URL for the context. An unparsable host falls back to `localhost`.
fn request_url(request: &Request<Body>, host: &str) -> Result<Url, url::ParseError> {
    let scheme = request.uri().scheme_str().unwrap_or("http");
    let host = if host.is_empty() { "localhost" } else { host };
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Url::parse(&format!("{scheme}://{host}{path_and_query}"))
        .or_else(|_| Url::parse(&format!("http://localhost{path_and_query}")))
}

fn empty(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
