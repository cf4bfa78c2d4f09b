//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated `EngineConfig` into a route tree
//! - Build the priority list and global parameter patterns
//! - Register routes and assemble the dispatcher
//!
//! # Design Decisions
//! - Fail fast: any registration error is fatal
//! - Middleware and controllers are looked up by name in registries, so the
//!   same config can run against custom registries
//! - Listeners start last (traffic only when ready); that is the binary's job

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::{ConstraintConfig, EngineConfig, GroupConfig, MiddlewareConfig, RouteConfig};
use crate::config::validation::parse_method;
use crate::error::RegistrationError;
use crate::http::controller::{ClassRef, ControllerRegistry};
use crate::http::dispatcher::{DispatchOptions, Dispatcher};
use crate::middleware::priority::PriorityList;
use crate::middleware::registry::MiddlewareRegistry;
use crate::routing::constraint::{Constraint, ParameterPatterns};
use crate::routing::group::{Route, RouteGroup};
use crate::routing::router::Router;

/// Build a dispatcher with the built-in middleware and controllers.
pub fn bootstrap(config: &EngineConfig) -> Result<Dispatcher, RegistrationError> {
    let middleware =
        MiddlewareRegistry::with_builtins(Duration::from_millis(config.middleware.timeout_ms));
    bootstrap_with(config, &middleware, Arc::new(ControllerRegistry::with_builtins()))
}

/// Build a dispatcher against caller-supplied registries.
pub fn bootstrap_with(
    config: &EngineConfig,
    middleware: &MiddlewareRegistry,
    controllers: Arc<ControllerRegistry>,
) -> Result<Dispatcher, RegistrationError> {
    let router = build_router(config, middleware, &controllers)?;
    tracing::info!(routes = router.len(), "Router built");

    Ok(Dispatcher::new(Arc::new(router), controllers).with_options(DispatchOptions {
        method_not_allowed: config.dispatch.method_not_allowed,
    }))
}

/// Flatten the configured routes and register them.
pub fn build_router(
    config: &EngineConfig,
    middleware: &MiddlewareRegistry,
    controllers: &ControllerRegistry,
) -> Result<Router, RegistrationError> {
    let priority = build_priority(&config.middleware)?;
    let patterns = build_patterns(&config.patterns)?;

    let mut root = RouteGroup::new();
    for route in &config.routes {
        root = root.route(build_route(route, middleware, controllers)?);
    }
    for group in &config.groups {
        root = root.group(build_group(group, middleware, controllers)?);
    }

    let mut router = Router::new(priority, Arc::new(patterns));
    router.register(root.flatten()?);
    Ok(router)
}

/// `priority`, then every `insert_before`, then every `insert_after`.
pub fn build_priority(config: &MiddlewareConfig) -> Result<PriorityList, RegistrationError> {
    let mut builder = config
        .priority
        .iter()
        .fold(PriorityList::builder(), |builder, name| builder.push(name.as_str()));
    for insert in &config.insert_before {
        builder = builder.add_before(&insert.anchor, insert.name.as_str())?;
    }
    for insert in &config.insert_after {
        builder = builder.add_after(&insert.anchor, insert.name.as_str())?;
    }
    Ok(builder.build())
}

pub fn build_patterns(
    rules: &BTreeMap<String, ConstraintConfig>,
) -> Result<ParameterPatterns, RegistrationError> {
    let mut patterns = ParameterPatterns::new();
    for (param, rule) in rules {
        patterns.insert(param.as_str(), build_constraint(param, rule)?);
    }
    Ok(patterns)
}

pub fn build_constraint(param: &str, rule: &ConstraintConfig) -> Result<Constraint, RegistrationError> {
    let invalid = |source| RegistrationError::InvalidConstraint {
        param: param.to_string(),
        source,
    };
    match rule {
        ConstraintConfig::Builtin { name } => Ok(Constraint::builtin(name.as_str())),
        ConstraintConfig::Regex { pattern } => Constraint::regex(pattern).map_err(invalid),
        ConstraintConfig::OneOf { values } => Constraint::one_of(values).map_err(invalid),
    }
}

fn build_group(
    config: &GroupConfig,
    middleware: &MiddlewareRegistry,
    controllers: &ControllerRegistry,
) -> Result<RouteGroup, RegistrationError> {
    let mut group = RouteGroup::new()
        .prefix(config.prefix.as_str())
        .name_prefix(config.name_prefix.as_str());
    if let Some(domain) = &config.domain {
        group = group.domain(domain.as_str());
    }
    for entry in middleware.resolve_all(&config.middleware)? {
        group = group.middleware(entry);
    }
    for name in &config.without_middleware {
        group = group.without_middleware(name.as_str());
    }
    for (param, rule) in &config.constraints {
        group = group.constrain(param.as_str(), build_constraint(param, rule)?);
    }
    for route in &config.routes {
        group = group.route(build_route(route, middleware, controllers)?);
    }
    for child in &config.groups {
        group = group.group(build_group(child, middleware, controllers)?);
    }
    Ok(group)
}

fn build_route(
    config: &RouteConfig,
    middleware: &MiddlewareRegistry,
    controllers: &ControllerRegistry,
) -> Result<Route, RegistrationError> {
    if !controllers.contains(&config.controller) {
        return Err(RegistrationError::UnknownController(config.controller.clone()));
    }
    let methods = config
        .methods
        .iter()
        .map(|m| parse_method(m).ok_or_else(|| RegistrationError::InvalidMethod(m.clone())))
        .collect::<Result<Vec<_>, _>>()?;

    let mut route = Route::new(
        methods,
        config.path.as_str(),
        ClassRef::injectable(config.controller.as_str()),
    );
    if let Some(name) = &config.name {
        route = route.name(name.as_str());
    }
    if let Some(domain) = &config.domain {
        route = route.domain(domain.as_str());
    }
    for entry in middleware.resolve_all(&config.middleware)? {
        route = route.middleware(entry);
    }
    for name in &config.without_middleware {
        route = route.without_middleware(name.as_str());
    }
    for (param, rule) in &config.constraints {
        route = route.constrain(param.as_str(), build_constraint(param, rule)?);
    }
    for (key, value) in &config.metadata {
        route = route.meta(key.as_str(), value.clone());
    }
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::PriorityInsert;
    use axum::http::Method;
    use pretty_assertions::assert_eq;

    fn config(toml: &str) -> EngineConfig {
        toml::from_str(toml).unwrap()
    }

    fn registries() -> (MiddlewareRegistry, ControllerRegistry) {
        (
            MiddlewareRegistry::with_builtins(Duration::from_secs(1)),
            ControllerRegistry::with_builtins(),
        )
    }

    #[test]
    fn test_priority_inserts_apply_in_order() {
        let config = MiddlewareConfig {
            priority: vec!["a".into(), "c".into()],
            insert_before: vec![PriorityInsert { anchor: "c".into(), name: "b".into() }],
            insert_after: vec![PriorityInsert { anchor: "c".into(), name: "d".into() }],
            ..MiddlewareConfig::default()
        };
        assert_eq!(build_priority(&config).unwrap().names(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_unknown_priority_anchor_fails() {
        let config = MiddlewareConfig {
            insert_after: vec![PriorityInsert { anchor: "missing".into(), name: "x".into() }],
            ..MiddlewareConfig::default()
        };
        assert!(matches!(
            build_priority(&config),
            Err(RegistrationError::UnknownPriorityAnchor(a)) if a == "missing"
        ));
    }

    #[test]
    fn test_build_router_from_config() {
        let config = config(
            r#"
            [middleware]
            priority = ["request_id"]

            [patterns]
            id = { kind = "builtin", name = "numeric" }

            [[routes]]
            path = "/health"
            controller = "text"

            [[groups]]
            prefix = "/api"
            name_prefix = "api."
            middleware = ["request_logging", "request_id"]

            [[groups.routes]]
            path = "/posts/{id}"
            methods = ["get", "put"]
            controller = "echo"
            name = "posts.show"
            "#,
        );
        let (middleware, controllers) = registries();
        let router = build_router(&config, &middleware, &controllers).unwrap();

        assert_eq!(router.len(), 2);
        let posts = &router.routes()[1];
        assert_eq!(posts.path(), "/api/posts/{id}");
        assert_eq!(posts.name(), Some("api.posts.show"));
        assert_eq!(posts.methods(), [Method::GET, Method::PUT]);

        let matched = router.lookup(&Method::PUT, "x", "/api/posts/7").unwrap().matched.unwrap();
        assert_eq!(matched.pipeline.names(), vec!["request_id", "request_logging"]);
        assert!(!router.lookup(&Method::GET, "x", "/api/posts/abc").unwrap().is_match());
    }

    #[test]
    fn test_unknown_names_fail_registration() {
        let (middleware, controllers) = registries();

        let unknown_controller = config("[[routes]]\npath = \"/\"\ncontroller = \"nope\"\n");
        assert!(matches!(
            build_router(&unknown_controller, &middleware, &controllers),
            Err(RegistrationError::UnknownController(c)) if c == "nope"
        ));

        let unknown_middleware = config("[[routes]]\npath = \"/\"\ncontroller = \"echo\"\nmiddleware = [\"auth\"]\n");
        assert!(matches!(
            build_router(&unknown_middleware, &middleware, &controllers),
            Err(RegistrationError::UnknownMiddleware(m)) if m == "auth"
        ));
    }

    #[test]
    fn test_bad_pattern_fails_registration() {
        let (middleware, controllers) = registries();
        let bad = config("[[routes]]\npath = \"/files/*\"\ncontroller = \"echo\"\n");
        let err = build_router(&bad, &middleware, &controllers).unwrap_err();
        assert!(matches!(err, RegistrationError::Pattern { .. }));
    }
}
