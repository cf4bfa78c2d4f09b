//! Request-scoped context handed through the middleware pipeline.
//!
//! # Responsibilities
//! - Carry the request, decoded and raw parameters, parsed URL and route
//! - Record the first abort raised while the request is in flight
//!
//! # Design Decisions
//! - Passed by value: a middleware that changes the context before calling
//!   `next` affects every stage downstream of it
//! - The abort slot is shared through an `AbortHandle` so stages that have
//!   already moved the context into `next` can still abort

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request},
    response::Response,
};
use serde_json::Value;
use url::Url;

use crate::error::DispatchError;
use crate::routing::params::Params;
use crate::routing::route::RouteDefinition;

/// Context for one in-flight request.
pub struct RequestContext {
    request: Request<Body>,
    params: Params,
    raw_params: Params,
    url: Url,
    route: Arc<RouteDefinition>,
    abort: AbortHandle,
}

impl RequestContext {
    /// Build a context from the raw captures returned by the matcher.
    ///
    /// Values are percent-decoded here; a value that fails to decode is kept raw.
    pub fn new(request: Request<Body>, raw_params: Params, url: Url, route: Arc<RouteDefinition>) -> Self {
        let params = raw_params.map_values(decode_param);
        Self {
            request,
            params,
            raw_params,
            url,
            route,
            abort: AbortHandle::default(),
        }
    }

    pub fn request(&self) -> &Request<Body> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<Body> {
        &mut self.request
    }

    pub fn into_request(self) -> Request<Body> {
        self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.request.headers_mut()
    }

    /// Decoded value of a captured parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Captured values exactly as they appeared in the request.
    pub fn raw_params(&self) -> &Params {
        &self.raw_params
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn route(&self) -> &Arc<RouteDefinition> {
        &self.route
    }

    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.route.metadata().get(key)
    }

    /// Record `response` as this request's abort response (unless an earlier
    /// abort already won) and return the error that unwinds the chain.
    pub fn abort(&self, response: Response) -> DispatchError {
        self.abort.abort(response)
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }
}

/// Shared handle to a request's abort slot.
#[derive(Clone, Default)]
pub struct AbortHandle {
    slot: Arc<Mutex<Option<Response>>>,
}

impl AbortHandle {
    /// First call wins; later responses are dropped.
    pub fn abort(&self, response: Response) -> DispatchError {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(response);
        } else {
            tracing::debug!("request already aborted, ignoring later abort");
        }
        DispatchError::Aborted
    }

    pub fn is_aborted(&self) -> bool {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Take the recorded abort response, if any.
    pub fn take(&self) -> Option<Response> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

fn decode_param(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
