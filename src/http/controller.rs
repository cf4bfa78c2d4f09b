//! Controller references and their collaborators.
//!
//! # Responsibilities
//! - Tag controllers as plain callables or class references that must be
//!   built by an external resolver
//! - Define the resolver and view-renderer seams
//! - Provide the built-in controllers used by configured routes
//!
//! # Design Decisions
//! - The callable/class distinction is an explicit enum, never inferred
//! - A class reference carries an `injectable` marker; dispatching one
//!   without it is a request-time error

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use crate::error::DispatchError;
use crate::http::context::RequestContext;

/// What a controller may produce.
#[derive(Debug)]
pub enum ControllerOutput {
    Response(Response),
    View(ViewElement),
    /// Rendered as `204 No Content`.
    Empty,
}

impl From<Response> for ControllerOutput {
    fn from(response: Response) -> Self {
        ControllerOutput::Response(response)
    }
}

impl From<ViewElement> for ControllerOutput {
    fn from(view: ViewElement) -> Self {
        ControllerOutput::View(view)
    }
}

/// A renderable view: template name plus data.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewElement {
    pub template: String,
    pub data: Value,
}

impl ViewElement {
    pub fn new(template: impl Into<String>, data: Value) -> Self {
        Self {
            template: template.into(),
            data,
        }
    }
}

pub type ControllerResult = Result<ControllerOutput, DispatchError>;

/// An invokable controller.
pub trait Handler: Send + Sync {
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, ControllerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = ControllerResult> + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, ControllerResult> {
        Box::pin(self(ctx))
    }
}

/// Reference to a controller that must be constructed externally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassRef {
    name: String,
    injectable: bool,
}

impl ClassRef {
    /// A class reference carrying the injectable marker.
    pub fn injectable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            injectable: true,
        }
    }

    /// A class reference without the marker. Dispatching it fails.
    pub fn unmarked(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            injectable: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_injectable(&self) -> bool {
        self.injectable
    }
}

/// A route's controller.
#[derive(Clone)]
pub enum ControllerRef {
    Callable(Arc<dyn Handler>),
    Class(ClassRef),
}

impl ControllerRef {
    pub fn callable(handler: impl Handler + 'static) -> Self {
        ControllerRef::Callable(Arc::new(handler))
    }

    pub fn class(name: impl Into<String>) -> Self {
        ControllerRef::Class(ClassRef::injectable(name))
    }

    /// Short label for logs and route listings.
    pub fn label(&self) -> String {
        match self {
            ControllerRef::Callable(_) => "<callable>".to_string(),
            ControllerRef::Class(class) => class.name().to_string(),
        }
    }
}

impl From<ClassRef> for ControllerRef {
    fn from(class: ClassRef) -> Self {
        ControllerRef::Class(class)
    }
}

impl fmt::Debug for ControllerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerRef::Callable(_) => f.write_str("Callable(..)"),
            ControllerRef::Class(class) => f.debug_tuple("Class").field(class).finish(),
        }
    }
}

/// Builds handlers for class references (dependency injection seam).
pub trait ControllerResolver: Send + Sync {
    fn resolve(&self, class: &ClassRef) -> Option<Arc<dyn Handler>>;
}

/// Turns a view element into a response.
pub trait ViewRenderer: Send + Sync {
    fn render(&self, view: ViewElement) -> Result<Response, DispatchError>;
}

/// Renders the view data as a JSON body, tagging the template in a header.
#[derive(Debug, Clone, Default)]
pub struct JsonViewRenderer;

pub const X_VIEW_TEMPLATE: &str = "x-view-template";

impl ViewRenderer for JsonViewRenderer {
    fn render(&self, view: ViewElement) -> Result<Response, DispatchError> {
        let mut response = Json(view.data).into_response();
        let template = view
            .template
            .parse()
            .map_err(|_| DispatchError::Render(format!("invalid template name '{}'", view.template)))?;
        response.headers_mut().insert(X_VIEW_TEMPLATE, template);
        Ok(response)
    }
}

/// Named controllers resolvable from class references.
#[derive(Default, Clone)]
pub struct ControllerRegistry {
    controllers: HashMap<String, Arc<dyn Handler>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `echo` and `text`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.insert("echo", echo);
        registry.insert("text", text);
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>, handler: impl Handler + 'static) {
        self.controllers.insert(name.into(), Arc::new(handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.controllers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.controllers.keys().map(String::as_str)
    }
}

impl ControllerResolver for ControllerRegistry {
    fn resolve(&self, class: &ClassRef) -> Option<Arc<dyn Handler>> {
        self.controllers.get(class.name()).cloned()
    }
}

/// Echo the matched route and its decoded parameters as JSON.
async fn echo(ctx: RequestContext) -> ControllerResult {
    let params: serde_json::Map<String, Value> = ctx
        .params()
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    let body = json!({
        "route": ctx.route().name(),
        "pattern": ctx.route().path(),
        "method": ctx.method().as_str(),
        "params": params,
    });
    Ok(Json(body).into_response().into())
}

/// Plain-text body taken from the route's `body` metadata.
async fn text(ctx: RequestContext) -> ControllerResult {
    match ctx.metadata("body").and_then(Value::as_str) {
        Some(body) => {
            let response = Response::builder()
                .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(Body::from(body.to_string()))
                .map_err(DispatchError::handler)?;
            Ok(response.into())
        }
        None => Ok(ControllerOutput::Response(
            (StatusCode::NO_CONTENT, ()).into_response(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_marker() {
        assert!(ClassRef::injectable("users").is_injectable());
        assert!(!ClassRef::unmarked("users").is_injectable());
        assert_eq!(ControllerRef::class("users").label(), "users");
    }

    #[test]
    fn test_registry_resolves_builtins() {
        let registry = ControllerRegistry::with_builtins();
        assert!(registry.resolve(&ClassRef::injectable("echo")).is_some());
        assert!(registry.resolve(&ClassRef::injectable("missing")).is_none());
    }

    #[test]
    fn test_json_view_renderer() {
        let response = JsonViewRenderer
            .render(ViewElement::new("users/show", json!({"id": 1})))
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[X_VIEW_TEMPLATE], "users/show");
    }
}
