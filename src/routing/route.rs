//! Concrete, registered routes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;
use serde_json::Value;

use crate::http::controller::ControllerRef;
use crate::middleware::set::MiddlewareSet;
use crate::routing::constraint::ConstraintSet;
use crate::routing::matcher::RouteMatcher;
use crate::routing::pattern::{CompiledPattern, Specificity};

/// A flattened route. Immutable once built.
#[derive(Debug)]
pub struct RouteDefinition {
    matcher: RouteMatcher,
    methods: Vec<Method>,
    controller: ControllerRef,
    middleware: Arc<MiddlewareSet>,
    constraints: ConstraintSet,
    name: Option<String>,
    metadata: HashMap<String, Value>,
}

impl RouteDefinition {
    pub(crate) fn new(
        matcher: RouteMatcher,
        methods: Vec<Method>,
        controller: ControllerRef,
        middleware: Arc<MiddlewareSet>,
        constraints: ConstraintSet,
        name: Option<String>,
        metadata: HashMap<String, Value>,
    ) -> Self {
        Self {
            matcher,
            methods,
            controller,
            middleware,
            constraints,
            name,
            metadata,
        }
    }

    /// Source of the path pattern, e.g. `/users/{id}`.
    pub fn path(&self) -> &str {
        self.matcher.path().source()
    }

    pub fn path_pattern(&self) -> &CompiledPattern {
        self.matcher.path()
    }

    /// Source of the domain pattern, if the route is domain-specific.
    pub fn domain(&self) -> Option<&str> {
        self.matcher.domain().map(CompiledPattern::source)
    }

    pub fn domain_pattern(&self) -> Option<&CompiledPattern> {
        self.matcher.domain()
    }

    pub fn matcher(&self) -> &RouteMatcher {
        &self.matcher
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn controller(&self) -> &ControllerRef {
        &self.controller
    }

    /// Merged middleware, in declaration order. Shared with sibling routes
    /// that did not change their group's list.
    pub fn middleware(&self) -> &Arc<MiddlewareSet> {
        &self.middleware
    }

    /// Route-level `where` rules.
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn path_specificity(&self) -> Specificity {
        self.matcher.path().specificity()
    }

    pub fn domain_specificity(&self) -> Option<Specificity> {
        self.matcher.domain().map(CompiledPattern::specificity)
    }
}
