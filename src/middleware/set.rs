//! Merged middleware lists.
//!
//! # Responsibilities
//! - Derive a child list from a parent: parent entries, then additions,
//!   minus removals
//! - Cache the priority-sorted order once per list object
//!
//! # Design Decisions
//! - Removal is applied after addition at the same level, so removal wins
//! - Removal only subtracts from what exists at that point; a deeper level
//!   can add the entry back
//! - Sets are shared through `Arc`; the sort cache lives in the set, so
//!   every route holding the same `Arc` shares one sort

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::middleware::priority::PriorityList;
use crate::middleware::MiddlewareRef;

/// Ordered, de-duplicated middleware list.
#[derive(Default)]
pub struct MiddlewareSet {
    entries: Vec<MiddlewareRef>,
    sorted: OnceLock<Arc<[MiddlewareRef]>>,
}

impl MiddlewareSet {
    pub fn new(entries: impl IntoIterator<Item = MiddlewareRef>) -> Self {
        let mut set = Self::default();
        for entry in entries {
            set.push(entry);
        }
        set
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&mut self, entry: MiddlewareRef) {
        if !self.contains(entry.name()) {
            self.entries.push(entry);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|m| m.name() == name)
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[MiddlewareRef] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A new set: these entries, then `add`, minus anything named in `remove`.
    pub fn derive(&self, add: &[MiddlewareRef], remove: &[String]) -> MiddlewareSet {
        let mut derived = MiddlewareSet::new(self.entries.iter().cloned());
        for entry in add {
            derived.push(entry.clone());
        }
        derived
            .entries
            .retain(|m| !remove.iter().any(|name| name == m.name()));
        derived
    }

    /// Priority-sorted entries.
    ///
    /// Sorted on first call; every later call returns the same slice, even
    /// with a different priority list.
    pub fn sorted(&self, priority: &PriorityList) -> Arc<[MiddlewareRef]> {
        self.sorted
            .get_or_init(|| {
                tracing::trace!(middleware = ?self.names(), "sorting middleware list");
                priority.sort(&self.entries).into()
            })
            .clone()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted.get().is_some()
    }
}

impl fmt::Debug for MiddlewareSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareSet")
            .field("entries", &self.names())
            .field("sorted", &self.is_sorted())
            .finish()
    }
}
