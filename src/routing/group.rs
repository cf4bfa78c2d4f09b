//! Route declarations and group flattening.
//!
//! # Data Flow
//! ```text
//! RouteGroup tree (prefix, domain, name prefix, middleware, where)
//!     → flatten(): walk the tree carrying an immutable Scope
//!     → one RouteDefinition per Route leaf
//!     → groups are dropped
//! ```
//!
//! # Design Decisions
//! - Prefix and name prefix concatenate; domain is overridden by the child
//! - `where` rules merge per parameter, child wins
//! - Middleware: parent list, then own additions, minus own removals. A level
//!   that changes nothing reuses its parent's list object, so siblings
//!   share one list (and one priority sort)

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;
use serde_json::Value;

use crate::error::{PatternError, RegistrationError};
use crate::http::controller::ControllerRef;
use crate::middleware::set::MiddlewareSet;
use crate::middleware::MiddlewareRef;
use crate::routing::constraint::{Constraint, ConstraintSet};
use crate::routing::matcher::RouteMatcher;
use crate::routing::pattern::CompiledPattern;
use crate::routing::route::RouteDefinition;

/// A single route declaration.
#[derive(Debug, Clone)]
pub struct Route {
    methods: Vec<Method>,
    path: String,
    controller: ControllerRef,
    domain: Option<String>,
    name: Option<String>,
    middleware: Vec<MiddlewareRef>,
    without_middleware: Vec<String>,
    constraints: ConstraintSet,
    metadata: HashMap<String, Value>,
}

impl Route {
    pub fn new(
        methods: impl IntoIterator<Item = Method>,
        path: impl Into<String>,
        controller: impl Into<ControllerRef>,
    ) -> Self {
        Self {
            methods: methods.into_iter().collect(),
            path: path.into(),
            controller: controller.into(),
            domain: None,
            name: None,
            middleware: Vec::new(),
            without_middleware: Vec::new(),
            constraints: ConstraintSet::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn get(path: impl Into<String>, controller: impl Into<ControllerRef>) -> Self {
        Self::new([Method::GET], path, controller)
    }

    pub fn post(path: impl Into<String>, controller: impl Into<ControllerRef>) -> Self {
        Self::new([Method::POST], path, controller)
    }

    pub fn put(path: impl Into<String>, controller: impl Into<ControllerRef>) -> Self {
        Self::new([Method::PUT], path, controller)
    }

    pub fn patch(path: impl Into<String>, controller: impl Into<ControllerRef>) -> Self {
        Self::new([Method::PATCH], path, controller)
    }

    pub fn delete(path: impl Into<String>, controller: impl Into<ControllerRef>) -> Self {
        Self::new([Method::DELETE], path, controller)
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn middleware(mut self, middleware: MiddlewareRef) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn without_middleware(mut self, name: impl Into<String>) -> Self {
        self.without_middleware.push(name.into());
        self
    }

    /// Route-level `where` rule for a captured parameter.
    pub fn constrain(mut self, param: impl Into<String>, constraint: Constraint) -> Self {
        self.constraints.insert(param, constraint);
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Flatten this route on its own, outside any group.
    pub fn build(self) -> Result<Arc<RouteDefinition>, RegistrationError> {
        self.flatten(&Scope::root())
    }

    fn flatten(self, scope: &Scope) -> Result<Arc<RouteDefinition>, RegistrationError> {
        if self.methods.is_empty() {
            return Err(RegistrationError::NoMethods(self.path));
        }

        let path = join_path(&scope.prefix, &self.path);
        let compiled_path =
            CompiledPattern::path(&path).map_err(|e| RegistrationError::pattern(&path, e))?;

        let domain = self.domain.or_else(|| scope.domain.clone());
        let compiled_domain = domain
            .as_deref()
            .map(|d| CompiledPattern::domain(d).map_err(|e| RegistrationError::pattern(d, e)))
            .transpose()?;
        if let (Some(d), Some(compiled)) = (domain.as_deref(), &compiled_domain) {
            let path_names = compiled_path.param_names();
            if let Some(shared) = compiled.param_names().into_iter().find(|n| path_names.contains(n)) {
                // domain and path captures share one params list
                let pattern = format!("{d}{path}");
                return Err(RegistrationError::pattern(
                    &pattern,
                    PatternError::DuplicateName(shared.to_string()),
                ));
            }
        }

        let middleware = scope.derive_middleware(&self.middleware, &self.without_middleware);
        let constraints = scope.constraints.merged(&self.constraints);
        let name = self.name.map(|n| format!("{}{}", scope.name_prefix, n));

        tracing::trace!(
            path = %path,
            domain = ?domain,
            methods = ?self.methods,
            middleware = ?middleware.names(),
            "Flattened route"
        );

        Ok(Arc::new(RouteDefinition::new(
            RouteMatcher::new(compiled_path, compiled_domain),
            self.methods,
            self.controller,
            middleware,
            constraints,
            name,
            self.metadata,
        )))
    }
}

/// Child of a group.
#[derive(Debug, Clone)]
pub enum Node {
    Route(Route),
    Group(RouteGroup),
}

/// Transient composition node; only exists until [`RouteGroup::flatten`].
#[derive(Debug, Clone, Default)]
pub struct RouteGroup {
    prefix: String,
    domain: Option<String>,
    name_prefix: String,
    middleware: Vec<MiddlewareRef>,
    without_middleware: Vec<String>,
    constraints: ConstraintSet,
    children: Vec<Node>,
}

impl RouteGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn middleware(mut self, middleware: MiddlewareRef) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn without_middleware(mut self, name: impl Into<String>) -> Self {
        self.without_middleware.push(name.into());
        self
    }

    pub fn constrain(mut self, param: impl Into<String>, constraint: Constraint) -> Self {
        self.constraints.insert(param, constraint);
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.children.push(Node::Route(route));
        self
    }

    pub fn group(mut self, group: RouteGroup) -> Self {
        self.children.push(Node::Group(group));
        self
    }

    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Collapse the tree into concrete routes, in declaration order.
    pub fn flatten(self) -> Result<Vec<Arc<RouteDefinition>>, RegistrationError> {
        let mut routes = Vec::new();
        self.flatten_into(&Scope::root(), &mut routes)?;
        Ok(routes)
    }

    fn flatten_into(
        self,
        parent: &Scope,
        out: &mut Vec<Arc<RouteDefinition>>,
    ) -> Result<(), RegistrationError> {
        let scope = parent.enter(&self);
        for child in self.children {
            match child {
                Node::Route(route) => out.push(route.flatten(&scope)?),
                Node::Group(group) => group.flatten_into(&scope, out)?,
            }
        }
        Ok(())
    }
}

/// Effective context while walking the group tree.
struct Scope {
    prefix: String,
    domain: Option<String>,
    name_prefix: String,
    constraints: ConstraintSet,
    middleware: Arc<MiddlewareSet>,
}

impl Scope {
    fn root() -> Self {
        Self {
            prefix: String::new(),
            domain: None,
            name_prefix: String::new(),
            constraints: ConstraintSet::new(),
            middleware: MiddlewareSet::empty(),
        }
    }

    fn enter(&self, group: &RouteGroup) -> Scope {
        Scope {
            prefix: join_path(&self.prefix, &group.prefix),
            domain: group.domain.clone().or_else(|| self.domain.clone()),
            name_prefix: format!("{}{}", self.name_prefix, group.name_prefix),
            constraints: self.constraints.merged(&group.constraints),
            middleware: self.derive_middleware(&group.middleware, &group.without_middleware),
        }
    }

    fn derive_middleware(&self, add: &[MiddlewareRef], remove: &[String]) -> Arc<MiddlewareSet> {
        if add.is_empty() && remove.is_empty() {
            Arc::clone(&self.middleware)
        } else {
            Arc::new(self.middleware.derive(add, remove))
        }
    }
}

/// Join a prefix and a path with exactly one slash between them.
fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => String::new(),
        (true, false) if path.starts_with('/') => path.to_string(),
        (true, false) => format!("/{path}"),
        (false, true) => normalize_prefix(prefix),
        (false, false) => {
            let path = path.strip_prefix('/').unwrap_or(path);
            format!("{}/{}", normalize_prefix(prefix), path)
        }
    }
}

fn normalize_prefix(prefix: &str) -> String {
    if prefix.starts_with('/') {
        prefix.to_string()
    } else {
        format!("/{prefix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::controller::ClassRef;
    use crate::middleware::builtin::Noop;
    use crate::routing::params::Params;

    fn controller() -> ControllerRef {
        ClassRef::injectable("c").into()
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "/users"), "/users");
        assert_eq!(join_path("/api", "/users"), "/api/users");
        assert_eq!(join_path("/api/", "users"), "/api/users");
        assert_eq!(join_path("api", "/"), "/api/");
        assert_eq!(join_path("/api", ""), "/api");
        assert_eq!(join_path("", ""), "");
    }

    #[test]
    fn test_nested_groups_flatten() {
        let routes = RouteGroup::new()
            .prefix("/api")
            .name_prefix("api.")
            .domain("{tenant}.example.com")
            .group(
                RouteGroup::new()
                    .prefix("/v1")
                    .name_prefix("v1.")
                    .route(Route::get("/users/{id}", controller()).name("users.show"))
                    .route(Route::get("/status", controller()).domain("status.example.com")),
            )
            .flatten()
            .unwrap();

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].path(), "/api/v1/users/{id}");
        assert_eq!(routes[0].name(), Some("api.v1.users.show"));
        assert_eq!(routes[0].domain(), Some("{tenant}.example.com"));
        assert_eq!(routes[1].domain(), Some("status.example.com"));
        assert_eq!(routes[1].name(), None);
    }

    #[test]
    fn test_constraints_merge_child_wins() {
        let routes = RouteGroup::new()
            .constrain("id", Constraint::numeric())
            .constrain("slug", Constraint::alphanumeric())
            .route(Route::get("/{id}/{slug}", controller()).constrain("id", Constraint::uuid()))
            .flatten()
            .unwrap();

        let rules = routes[0].constraints();
        assert_eq!(rules.len(), 2);
        let params: Params = [("id", "42"), ("slug", "abc")].into_iter().collect();
        assert!(!rules.allows(&params).unwrap());
    }

    #[test]
    fn test_siblings_share_middleware_set() {
        let routes = RouteGroup::new()
            .middleware(Noop::named("auth"))
            .route(Route::get("/a", controller()))
            .route(Route::get("/b", controller()))
            .route(Route::get("/c", controller()).middleware(Noop::named("extra")))
            .flatten()
            .unwrap();

        assert!(Arc::ptr_eq(routes[0].middleware(), routes[1].middleware()));
        assert!(!Arc::ptr_eq(routes[0].middleware(), routes[2].middleware()));
        assert_eq!(routes[2].middleware().names(), vec!["auth", "extra"]);
    }

    #[test]
    fn test_without_middleware_and_re_add() {
        let routes = RouteGroup::new()
            .middleware(Noop::named("auth"))
            .middleware(Noop::named("log"))
            .group(
                RouteGroup::new()
                    .without_middleware("auth")
                    .route(Route::get("/public", controller()))
                    .route(Route::get("/mixed", controller()).middleware(Noop::named("auth"))),
            )
            .route(Route::get("/private", controller()))
            .route(Route::get("/quiet", controller()).without_middleware("log"))
            .flatten()
            .unwrap();

        let names: Vec<Vec<&str>> = routes.iter().map(|r| r.middleware().names()).collect();
        assert_eq!(names[0], vec!["log"]);
        assert_eq!(names[1], vec!["log", "auth"]);
        assert_eq!(names[2], vec!["auth", "log"]);
        assert_eq!(names[3], vec!["auth"]);
    }

    #[test]
    fn test_invalid_pattern_reports_full_path() {
        let err = RouteGroup::new()
            .prefix("/files")
            .route(Route::get("/{...rest}/edit", controller()))
            .flatten()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid pattern '/files/{...rest}/edit': wildcard '{...rest}' must be the last segment"
        );
    }

    #[test]
    fn test_route_without_methods_is_rejected() {
        let err = Route::new(Vec::<Method>::new(), "/x", controller()).build().unwrap_err();
        assert!(matches!(err, RegistrationError::NoMethods(p) if p == "/x"));
    }

    #[test]
    fn test_name_captured_by_domain_and_path_is_rejected() {
        let err = RouteGroup::new()
            .domain("{id}.example.com")
            .route(Route::get("/items/{id}", controller()).constrain("id", Constraint::numeric()))
            .flatten()
            .unwrap_err();
        assert!(matches!(
            &err,
            RegistrationError::Pattern { source: PatternError::DuplicateName(n), .. } if n == "id"
        ));
        assert!(err.to_string().contains("{id}.example.com/items/{id}"));

        let distinct = Route::get("/items/{item}", controller())
            .domain("{account}.example.com")
            .build()
            .unwrap();
        assert_eq!(distinct.path(), "/items/{item}");
    }
}
