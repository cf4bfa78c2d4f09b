//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use route_engine::http::{ControllerRegistry, ControllerResult, Dispatcher, RequestContext};
use route_engine::middleware::{from_fn, MiddlewareRef, PriorityList};
use route_engine::routing::{ParameterPatterns, RouteGroup, Router};
use serde_json::Value;

/// Shared event log written by [`recorder`] middleware.
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Middleware that records "before NAME" / "after NAME" around `next`.
pub fn recorder(name: &'static str, log: &Log) -> MiddlewareRef {
    let log = Arc::clone(log);
    from_fn(name, move |ctx, next| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().unwrap().push(format!("before {name}"));
            let result = next.run(ctx).await;
            log.lock().unwrap().push(format!("after {name}"));
            result
        })
    })
}

pub fn router(group: RouteGroup, priority: PriorityList, patterns: ParameterPatterns) -> Router {
    let mut router = Router::new(priority, Arc::new(patterns));
    router.register(group.flatten().expect("routes should flatten"));
    router
}

/// Dispatcher with the built-in controller registry.
pub fn dispatcher(group: RouteGroup) -> Dispatcher {
    dispatcher_with(group, PriorityList::default(), ParameterPatterns::new())
}

pub fn dispatcher_with(group: RouteGroup, priority: PriorityList, patterns: ParameterPatterns) -> Dispatcher {
    Dispatcher::new(
        Arc::new(router(group, priority, patterns)),
        Arc::new(ControllerRegistry::with_builtins()),
    )
}

pub fn request(method: Method, host: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, host)
        .body(Body::empty())
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    request(Method::GET, "example.com", uri)
}

pub fn status(code: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = code;
    response
}

pub fn text(body: impl Into<String>) -> Response {
    Response::new(Body::from(body.into()))
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

/// Controller that returns "ok".
pub async fn ok(_ctx: RequestContext) -> ControllerResult {
    Ok(text("ok").into())
}
