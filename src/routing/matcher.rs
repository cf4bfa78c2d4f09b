//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request host against a compiled domain pattern
//!   (case-insensitive, port ignored)
//! - Match the request path against a compiled path pattern
//!   (case-sensitive, trailing slash ignored)
//! - Combine both with AND semantics, domain first
//!
//! # Design Decisions
//! - A route without a domain pattern matches any host
//! - Captures are raw; decoding belongs to the dispatcher

use crate::routing::params::Params;
use crate::routing::pattern::{CompiledPattern, Specificity};

/// Trait for matching one request attribute against a compiled pattern.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Append captures to `params` and return true on a match.
    fn capture(&self, input: &str, params: &mut Params) -> bool;

    fn specificity(&self) -> Specificity;
}

/// Matches the request host.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    pattern: CompiledPattern,
}

impl HostMatcher {
    pub fn new(pattern: CompiledPattern) -> Self {
        Self { pattern }
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }
}

impl Matcher for HostMatcher {
    fn capture(&self, input: &str, params: &mut Params) -> bool {
        self.pattern.capture(&normalize_host(input), params)
    }

    fn specificity(&self) -> Specificity {
        self.pattern.specificity()
    }
}

/// Matches the request path.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    pattern: CompiledPattern,
}

impl PathMatcher {
    pub fn new(pattern: CompiledPattern) -> Self {
        Self { pattern }
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }
}

impl Matcher for PathMatcher {
    fn capture(&self, input: &str, params: &mut Params) -> bool {
        self.pattern.capture(input, params)
    }

    fn specificity(&self) -> Specificity {
        self.pattern.specificity()
    }
}

/// Domain and path matchers combined (AND).
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    host: Option<HostMatcher>,
    path: PathMatcher,
}

impl RouteMatcher {
    pub fn new(path: CompiledPattern, domain: Option<CompiledPattern>) -> Self {
        Self {
            host: domain.map(HostMatcher::new),
            path: PathMatcher::new(path),
        }
    }

    pub fn path(&self) -> &CompiledPattern {
        self.path.pattern()
    }

    pub fn domain(&self) -> Option<&CompiledPattern> {
        self.host.as_ref().map(HostMatcher::pattern)
    }

    /// Captures from the domain then the path, or `None`.
    pub fn matches(&self, host: &str, path: &str) -> Option<Params> {
        let mut params = Params::new();
        if let Some(matcher) = &self.host {
            if !matcher.capture(host, &mut params) {
                return None;
            }
        }
        self.path.capture(path, &mut params).then_some(params)
    }
}

/// Lowercase, drop any port and a trailing dot.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = if let Some(rest) = host.strip_prefix('[') {
        // IPv6 literal: keep the brackets' contents
        rest.split(']').next().unwrap_or(rest)
    } else {
        match host.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
            _ => host,
        }
    };
    without_port.trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("Example.COM"), "example.com");
        assert_eq!(normalize_host("example.com:8080"), "example.com");
        assert_eq!(normalize_host("example.com."), "example.com");
        assert_eq!(normalize_host("[::1]:3000"), "::1");
        assert_eq!(normalize_host(""), "");
    }

    #[test]
    fn test_route_matcher_and_semantics() {
        let matcher = RouteMatcher::new(
            CompiledPattern::path("/users/{id}").unwrap(),
            Some(CompiledPattern::domain("{account}.example.com").unwrap()),
        );

        let params = matcher.matches("acme.example.com:443", "/users/7").unwrap();
        assert_eq!(params.get("account"), Some("acme"));
        assert_eq!(params.get("id"), Some("7"));

        assert!(matcher.matches("example.org", "/users/7").is_none());
        assert!(matcher.matches("acme.example.com", "/posts/7").is_none());
    }

    #[test]
    fn test_route_without_domain_matches_any_host() {
        let matcher = RouteMatcher::new(CompiledPattern::path("/health").unwrap(), None);
        assert!(matcher.matches("anything.test", "/health").is_some());
        assert!(matcher.matches("", "/health/").is_some());
    }
}
