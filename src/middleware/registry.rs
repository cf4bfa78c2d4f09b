//! Name → middleware lookup for declaratively configured routes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::RegistrationError;
use crate::middleware::builtin::{RequestId, RequestLogging, Timeout};
use crate::middleware::MiddlewareRef;

/// Middleware instances addressable by name.
#[derive(Default, Clone)]
pub struct MiddlewareRegistry {
    entries: HashMap<String, MiddlewareRef>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `request_id`, `request_logging` and `timeout`.
    pub fn with_builtins(timeout: Duration) -> Self {
        let mut registry = Self::new();
        registry.insert(Arc::new(RequestId));
        registry.insert(Arc::new(RequestLogging));
        registry.insert(Arc::new(Timeout::new(timeout)));
        registry
    }

    /// Register under the middleware's own name, replacing any previous entry.
    pub fn insert(&mut self, middleware: MiddlewareRef) {
        self.entries.insert(middleware.name().to_string(), middleware);
    }

    pub fn get(&self, name: &str) -> Option<MiddlewareRef> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> Result<MiddlewareRef, RegistrationError> {
        self.get(name)
            .ok_or_else(|| RegistrationError::UnknownMiddleware(name.to_string()))
    }

    pub fn resolve_all(&self, names: &[String]) -> Result<Vec<MiddlewareRef>, RegistrationError> {
        names.iter().map(|n| self.resolve(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_resolve_by_name() {
        let registry = MiddlewareRegistry::with_builtins(Duration::from_secs(1));
        for name in ["request_id", "request_logging", "timeout"] {
            assert_eq!(registry.resolve(name).unwrap().name(), name);
        }
        assert!(matches!(
            registry.resolve("auth"),
            Err(RegistrationError::UnknownMiddleware(n)) if n == "auth"
        ));
    }
}
