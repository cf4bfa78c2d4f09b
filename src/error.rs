//! Error taxonomy for the routing engine.
//!
//! # Categories
//! - `PatternError`: malformed path or domain syntax (registration time)
//! - `RegistrationError`: anything that must stop startup
//! - `DispatchError`: request-time failures that propagate to the host
//!
//! A request that matches no route is not an error. It is reported through
//! `Lookup` and rendered as a 404-class response by the dispatcher.

use thiserror::Error;

/// Boxed error returned by controllers and middleware.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Malformed route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("forbidden token '{0}' (use {{name}} or {{...name}} instead)")]
    ForbiddenToken(char),

    #[error("unbalanced brace in segment '{0}'")]
    UnbalancedBrace(String),

    #[error("misplaced ellipsis in '{{{0}}}' (wildcards are written {{...name}})")]
    MisplacedEllipsis(String),

    #[error("invalid parameter name '{0}'")]
    InvalidName(String),

    #[error("parameter '{0}' is captured more than once")]
    DuplicateName(String),

    #[error("wildcard '{{...{0}}}' must be the last segment")]
    WildcardNotTerminal(String),

    #[error("wildcard '{{...{0}}}' must occupy a whole segment")]
    WildcardNotAlone(String),

    #[error("wildcards are not allowed in domain patterns")]
    WildcardInDomain,
}

/// Failure that must abort startup.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: PatternError,
    },

    #[error("priority anchor '{0}' is not in the priority list")]
    UnknownPriorityAnchor(String),

    #[error("unknown middleware '{0}'")]
    UnknownMiddleware(String),

    #[error("unknown controller '{0}'")]
    UnknownController(String),

    #[error("invalid constraint for '{param}': {source}")]
    InvalidConstraint {
        param: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("route '{0}' declares no HTTP methods")]
    NoMethods(String),
}

impl RegistrationError {
    pub fn pattern(pattern: &str, source: PatternError) -> Self {
        Self::Pattern {
            pattern: pattern.to_string(),
            source,
        }
    }
}

/// Request-time failure propagated to the host's error boundary.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown built-in constraint '{0}'")]
    UnknownConstraint(String),

    #[error("controller '{0}' is a class reference without the injectable marker")]
    UnmarkedController(String),

    #[error("controller '{0}' could not be resolved")]
    UnresolvedController(String),

    #[error("view rendering failed: {0}")]
    Render(String),

    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),

    /// Raised by `RequestContext::abort`. The dispatcher swaps it for the
    /// response recorded on the context.
    #[error("request aborted")]
    Aborted,
}

impl DispatchError {
    /// Wrap an arbitrary error raised by a controller or middleware.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_error_messages() {
        let err = RegistrationError::pattern("/a/{...rest}/b", PatternError::WildcardNotTerminal("rest".into()));
        assert_eq!(
            err.to_string(),
            "invalid pattern '/a/{...rest}/b': wildcard '{...rest}' must be the last segment"
        );
        assert_eq!(
            PatternError::MisplacedEllipsis("name...".into()).to_string(),
            "misplaced ellipsis in '{name...}' (wildcards are written {...name})"
        );
    }
}
