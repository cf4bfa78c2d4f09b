//! Parameter constraints.
//!
//! # Responsibilities
//! - Validate captured values against route-level `where` rules
//! - Validate captured values against the global parameter patterns
//!
//! # Design Decisions
//! - Route-level rules run first, then global ones; the first failure wins
//! - A rule for a parameter the route does not capture is skipped
//! - Regex and enum rules are anchored to the whole value
//! - Named built-ins are resolved on evaluation, so an unknown name
//!   surfaces as a `DispatchError` rather than a silent 404

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::error::DispatchError;
use crate::routing::params::Params;

static BUILTINS: LazyLock<HashMap<&'static str, Regex>> = LazyLock::new(|| {
    [
        ("numeric", r"^\d+$"),
        ("alphanumeric", r"^[a-zA-Z0-9]+$"),
        (
            "uuid",
            r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$",
        ),
        ("ulid", r"(?i)^[0-7][0-9a-hjkmnp-tv-z]{25}$"),
    ]
    .into_iter()
    .map(|(name, expr)| (name, Regex::new(expr).expect("built-in constraint regex")))
    .collect()
});

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains_key(name)
}

/// A rule a captured value must satisfy.
#[derive(Clone)]
pub enum Constraint {
    /// One of the named built-ins (`numeric`, `alphanumeric`, `uuid`, `ulid`).
    Builtin(String),
    /// User regex, anchored.
    Pattern(Regex),
    /// One of a fixed set of literal strings.
    OneOf(Regex),
    /// Arbitrary predicate.
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl Constraint {
    pub fn builtin(name: impl Into<String>) -> Self {
        Constraint::Builtin(name.into())
    }

    pub fn numeric() -> Self {
        Self::builtin("numeric")
    }

    pub fn alphanumeric() -> Self {
        Self::builtin("alphanumeric")
    }

    pub fn uuid() -> Self {
        Self::builtin("uuid")
    }

    pub fn ulid() -> Self {
        Self::builtin("ulid")
    }

    /// Compile a user regex. The expression must match the whole value.
    pub fn regex(expr: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{expr})$")).map(Constraint::Pattern)
    }

    /// Accept exactly one of `values`.
    pub fn one_of<I, S>(values: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternation = values
            .into_iter()
            .map(|v| regex::escape(v.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!("^(?:{alternation})$")).map(Constraint::OneOf)
    }

    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Constraint::Predicate(Arc::new(f))
    }

    /// Check a single value.
    pub fn check(&self, value: &str) -> Result<bool, DispatchError> {
        match self {
            Constraint::Builtin(name) => BUILTINS
                .get(name.as_str())
                .map(|re| re.is_match(value))
                .ok_or_else(|| DispatchError::UnknownConstraint(name.clone())),
            Constraint::Pattern(re) | Constraint::OneOf(re) => Ok(re.is_match(value)),
            Constraint::Predicate(f) => Ok(f(value)),
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Builtin(name) => f.debug_tuple("Builtin").field(name).finish(),
            Constraint::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Constraint::OneOf(re) => f.debug_tuple("OneOf").field(&re.as_str()).finish(),
            Constraint::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Parameter name → constraint, in insertion order. Re-inserting a name
/// replaces its rule in place.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    rules: Vec<(String, Constraint)>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, constraint: Constraint) {
        let name = name.into();
        match self.rules.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = constraint,
            None => self.rules.push((name, constraint)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, constraint: Constraint) -> Self {
        self.insert(name, constraint);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Constraint> {
        self.rules.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.rules.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// `self` extended by `other`; rules in `other` win.
    pub fn merged(&self, other: &ConstraintSet) -> ConstraintSet {
        let mut merged = self.clone();
        for (name, constraint) in other.iter() {
            merged.insert(name, constraint.clone());
        }
        merged
    }

    /// True when every captured parameter with a rule satisfies it.
    pub fn allows(&self, params: &Params) -> Result<bool, DispatchError> {
        for (name, constraint) in self.iter() {
            if let Some(value) = params.get(name) {
                if !constraint.check(value)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

/// Process-wide parameter patterns applied to every route.
///
/// Owned explicitly and handed to the router at construction. Tests layer
/// overrides on top with [`ParameterPatterns::layered`].
#[derive(Debug, Clone, Default)]
pub struct ParameterPatterns {
    rules: ConstraintSet,
}

impl ParameterPatterns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, constraint: Constraint) -> Self {
        self.rules.insert(name, constraint);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, constraint: Constraint) {
        self.rules.insert(name, constraint);
    }

    /// A copy of these patterns with `overrides` applied on top.
    pub fn layered(&self, overrides: &ParameterPatterns) -> ParameterPatterns {
        ParameterPatterns {
            rules: self.rules.merged(&overrides.rules),
        }
    }

    pub fn rules(&self) -> &ConstraintSet {
        &self.rules
    }
}

/// Route rules first, then global patterns. Any failure rejects the match.
pub fn evaluate(
    route_rules: &ConstraintSet,
    patterns: &ParameterPatterns,
    params: &Params,
) -> Result<bool, DispatchError> {
    if !route_rules.allows(params)? {
        return Ok(false);
    }
    patterns.rules.allows(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        assert!(Constraint::numeric().check("12345").unwrap());
        assert!(!Constraint::numeric().check("12a").unwrap());
        assert!(Constraint::alphanumeric().check("abc123").unwrap());
        assert!(!Constraint::alphanumeric().check("abc-123").unwrap());
        assert!(Constraint::uuid().check("3f2504e0-4f89-41d3-9a0c-0305e82c3301").unwrap());
        assert!(!Constraint::uuid().check("3f2504e0-4f89-11d3-9a0c-0305e82c3301").unwrap());
        assert!(Constraint::ulid().check("01ARZ3NDEKTSV4RRFFQ69G5FAV").unwrap());
        assert!(!Constraint::ulid().check("01ARZ3NDEKTSV4RRFFQ69G5FA").unwrap());
        assert!(!Constraint::ulid().check("01ARZ3NDEKTSV4RRFFQ69G5FAU").unwrap());
    }

    #[test]
    fn test_unknown_builtin_is_an_error() {
        let err = Constraint::builtin("hex").check("ff").unwrap_err();
        assert!(matches!(err, DispatchError::UnknownConstraint(name) if name == "hex"));
    }

    #[test]
    fn test_regex_is_anchored() {
        let c = Constraint::regex("[a-z]+").unwrap();
        assert!(c.check("abc").unwrap());
        assert!(!c.check("abc1").unwrap());
        let alt = Constraint::regex("a|b").unwrap();
        assert!(!alt.check("ab").unwrap());
    }

    #[test]
    fn test_one_of_escapes_literals() {
        let c = Constraint::one_of(["v1.0", "v2.0"]).unwrap();
        assert!(c.check("v1.0").unwrap());
        assert!(!c.check("v1x0").unwrap());
        assert!(!c.check("v3.0").unwrap());
    }

    #[test]
    fn test_predicate() {
        let even = Constraint::predicate(|v| v.parse::<u32>().map(|n| n % 2 == 0).unwrap_or(false));
        assert!(even.check("4").unwrap());
        assert!(!even.check("5").unwrap());
    }

    #[test]
    fn test_absent_parameters_are_skipped() {
        let rules = ConstraintSet::new().with("id", Constraint::numeric());
        let params: Params = [("slug", "hello")].into_iter().collect();
        assert!(rules.allows(&params).unwrap());
    }

    #[test]
    fn test_route_rules_run_before_global_patterns() {
        // The failing route rule short-circuits before the unknown global built-in.
        let rules = ConstraintSet::new().with("id", Constraint::numeric());
        let patterns = ParameterPatterns::new().with("id", Constraint::builtin("nope"));
        let params: Params = [("id", "abc")].into_iter().collect();
        assert!(!evaluate(&rules, &patterns, &params).unwrap());

        let params: Params = [("id", "42")].into_iter().collect();
        assert!(evaluate(&rules, &patterns, &params).is_err());
    }

    #[test]
    fn test_layered_patterns_override() {
        let base = ParameterPatterns::new()
            .with("id", Constraint::numeric())
            .with("slug", Constraint::alphanumeric());
        let layered = base.layered(&ParameterPatterns::new().with("id", Constraint::uuid()));
        let params: Params = [("id", "42")].into_iter().collect();
        assert!(!evaluate(&ConstraintSet::new(), &layered, &params).unwrap());
        assert!(evaluate(&ConstraintSet::new(), &base, &params).unwrap());
        assert_eq!(layered.rules().len(), 2);
    }
}
