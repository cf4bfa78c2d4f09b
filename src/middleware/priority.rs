//! Global middleware priority order.
//!
//! # Responsibilities
//! - Hold the ordered list of priority middleware names
//! - Insert entries relative to an existing anchor (`add_before`/`add_after`)
//! - Sort a route's list: priority entries first, in priority order,
//!   everything else after, in declaration order

use crate::error::RegistrationError;
use crate::middleware::MiddlewareRef;

/// Ordered middleware names that run ahead of everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityList {
    names: Vec<String>,
}

impl PriorityList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = PriorityBuilder::default();
        for name in names {
            builder = builder.push(name);
        }
        builder.build()
    }

    pub fn builder() -> PriorityBuilder {
        PriorityBuilder::default()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Stable sort by priority position; unlisted entries keep their order
    /// and go last.
    pub fn sort(&self, entries: &[MiddlewareRef]) -> Vec<MiddlewareRef> {
        let mut sorted = entries.to_vec();
        sorted.sort_by_key(|m| self.position(m.name()).unwrap_or(usize::MAX));
        sorted
    }
}

/// Builder for [`PriorityList`].
#[derive(Debug, Clone, Default)]
pub struct PriorityBuilder {
    names: Vec<String>,
}

impl PriorityBuilder {
    /// Append `name`, moving it if already present.
    pub fn push(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.names.retain(|n| *n != name);
        self.names.push(name);
        self
    }

    /// Insert `name` immediately before `anchor`.
    pub fn add_before(self, anchor: &str, name: impl Into<String>) -> Result<Self, RegistrationError> {
        self.insert_relative(anchor, name.into(), 0)
    }

    /// Insert `name` immediately after `anchor`.
    pub fn add_after(self, anchor: &str, name: impl Into<String>) -> Result<Self, RegistrationError> {
        self.insert_relative(anchor, name.into(), 1)
    }

    fn insert_relative(mut self, anchor: &str, name: String, offset: usize) -> Result<Self, RegistrationError> {
        if anchor == name {
            return Err(RegistrationError::UnknownPriorityAnchor(anchor.to_string()));
        }
        self.names.retain(|n| *n != name);
        let index = self
            .names
            .iter()
            .position(|n| n == anchor)
            .ok_or_else(|| RegistrationError::UnknownPriorityAnchor(anchor.to_string()))?;
        self.names.insert(index + offset, name);
        Ok(self)
    }

    pub fn build(self) -> PriorityList {
        PriorityList { names: self.names }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::builtin::Noop;

    fn sorted_names(list: &PriorityList, entries: &[&str]) -> Vec<String> {
        let refs: Vec<MiddlewareRef> = entries.iter().map(|n| Noop::named(n)).collect();
        list.sort(&refs).iter().map(|m| m.name().to_string()).collect()
    }

    #[test]
    fn test_priority_entries_move_to_front() {
        let list = PriorityList::new(["a", "b"]);
        assert_eq!(sorted_names(&list, &["c", "b", "a"]), vec!["a", "b", "c"]);
        assert_eq!(sorted_names(&list, &["x", "b", "y", "z"]), vec!["b", "x", "y", "z"]);
        assert_eq!(sorted_names(&PriorityList::default(), &["y", "x"]), vec!["y", "x"]);
    }

    #[test]
    fn test_add_before_and_after() {
        let list = PriorityList::builder()
            .push("session")
            .push("auth")
            .add_before("auth", "csrf")
            .unwrap()
            .add_after("session", "locale")
            .unwrap()
            .build();
        assert_eq!(list.names(), ["session", "locale", "csrf", "auth"]);
    }

    #[test]
    fn test_unknown_anchor_is_fatal() {
        let err = PriorityList::builder().push("auth").add_after("missing", "x").unwrap_err();
        assert!(matches!(err, RegistrationError::UnknownPriorityAnchor(a) if a == "missing"));
    }

    #[test]
    fn test_reinsert_moves_entry() {
        let list = PriorityList::builder()
            .push("a")
            .push("b")
            .push("c")
            .add_before("a", "c")
            .unwrap()
            .build();
        assert_eq!(list.names(), ["c", "a", "b"]);
    }
}
