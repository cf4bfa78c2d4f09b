//! Route registry and lookup.
//!
//! # Responsibilities
//! - Index routes per HTTP method, split into domain-specific and
//!   domain-agnostic tables
//! - Prebuild each route's middleware pipeline (one priority sort per list)
//! - Find the highest-precedence route for (method, host, path)
//! - Report when the path exists for another method
//!
//! # Precedence
//! 1. Domain-specific routes, by domain specificity, then path
//!    specificity, then declaration order
//! 2. Domain-agnostic routes, by path specificity, then declaration order
//!
//! A route whose constraints reject the captures is skipped and the search
//! continues.
//!
//! # Design Decisions
//! - Immutable after registration; shared through `Arc` without locks
//! - Tables are kept pre-sorted, so lookup is a linear first-match scan
//! - Explicit `Lookup` result rather than a silent default

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::http::Method;

use crate::error::DispatchError;
use crate::middleware::pipeline::Pipeline;
use crate::middleware::priority::PriorityList;
use crate::observability::metrics;
use crate::routing::constraint::{self, ParameterPatterns};
use crate::routing::matcher::normalize_host;
use crate::routing::params::Params;
use crate::routing::route::RouteDefinition;

/// A successful match.
#[derive(Debug, Clone)]
pub struct Match {
    pub route: Arc<RouteDefinition>,
    /// Raw (still percent-encoded) captures.
    pub params: Params,
    pub pipeline: Pipeline,
}

/// Outcome of [`Router::lookup`].
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    pub matched: Option<Match>,
    /// No route matched, but the path matches a route for another method.
    pub method_mismatch: bool,
}

impl Lookup {
    pub fn is_match(&self) -> bool {
        self.matched.is_some()
    }
}

#[derive(Debug, Clone)]
struct Entry {
    route: Arc<RouteDefinition>,
    pipeline: Pipeline,
    order: usize,
}

#[derive(Debug, Default)]
struct MethodTable {
    domain_specific: Vec<Entry>,
    domain_agnostic: Vec<Entry>,
}

impl MethodTable {
    fn push(&mut self, entry: Entry) {
        if entry.route.domain_pattern().is_some() {
            self.domain_specific.push(entry);
        } else {
            self.domain_agnostic.push(entry);
        }
    }

    /// Restore precedence order after a batch of pushes. Sorts are stable.
    fn sort(&mut self) {
        self.domain_specific.sort_by_key(|e| {
            (
                Reverse(e.route.domain_specificity()),
                Reverse(e.route.path_specificity()),
                e.order,
            )
        });
        self.domain_agnostic
            .sort_by_key(|e| (Reverse(e.route.path_specificity()), e.order));
    }

    fn candidates(&self) -> impl Iterator<Item = &Entry> {
        self.domain_specific.iter().chain(self.domain_agnostic.iter())
    }
}

/// The route registry.
#[derive(Debug)]
pub struct Router {
    tables: HashMap<Method, MethodTable>,
    routes: Vec<Arc<RouteDefinition>>,
    // Addresses of `routes`; stable while the Arcs above are held.
    registered: HashSet<usize>,
    priority: PriorityList,
    patterns: Arc<ParameterPatterns>,
}

impl Router {
    pub fn new(priority: PriorityList, patterns: Arc<ParameterPatterns>) -> Self {
        Self {
            tables: HashMap::new(),
            routes: Vec::new(),
            registered: HashSet::new(),
            priority,
            patterns,
        }
    }

    /// Register routes; a route object that is already registered is skipped.
    ///
    /// Returns how many routes were added.
    pub fn register<I>(&mut self, routes: I) -> usize
    where
        I: IntoIterator<Item = Arc<RouteDefinition>>,
    {
        let mut added = 0;
        for route in routes {
            if !self.registered.insert(Arc::as_ptr(&route) as usize) {
                tracing::debug!(path = %route.path(), "Route already registered, skipping");
                continue;
            }

            let pipeline = Pipeline::new(route.middleware().sorted(&self.priority));
            let order = self.routes.len();
            for method in route.methods() {
                self.tables.entry(method.clone()).or_default().push(Entry {
                    route: Arc::clone(&route),
                    pipeline: pipeline.clone(),
                    order,
                });
            }

            tracing::debug!(
                methods = ?route.methods(),
                domain = ?route.domain(),
                path = %route.path(),
                middleware = ?pipeline.names(),
                "Registered route"
            );
            self.routes.push(route);
            added += 1;
        }
        if added > 0 {
            self.tables.values_mut().for_each(MethodTable::sort);
        }

        tracing::info!(added, total = self.routes.len(), "Route table updated");
        metrics::set_routes_registered(self.routes.len());
        added
    }

    /// All registered routes in registration order.
    pub fn routes(&self) -> &[Arc<RouteDefinition>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn priority(&self) -> &PriorityList {
        &self.priority
    }

    pub fn patterns(&self) -> &ParameterPatterns {
        &self.patterns
    }

    /// Find the route for a request.
    ///
    /// Errors only for request-time fatal conditions such as an unknown
    /// built-in constraint; "not found" is `Ok` with `matched: None`.
    pub fn lookup(&self, method: &Method, host: &str, path: &str) -> Result<Lookup, DispatchError> {
        let host = normalize_host(host);

        if let Some(table) = self.tables.get(method) {
            for entry in table.candidates() {
                let Some(params) = entry.route.matcher().matches(&host, path) else {
                    continue;
                };
                if constraint::evaluate(entry.route.constraints(), &self.patterns, &params)? {
                    return Ok(Lookup {
                        matched: Some(Match {
                            route: Arc::clone(&entry.route),
                            params,
                            pipeline: entry.pipeline.clone(),
                        }),
                        method_mismatch: false,
                    });
                }
                tracing::debug!(
                    path = %path,
                    route = %entry.route.path(),
                    "Constraints rejected match"
                );
            }
        }

        Ok(Lookup {
            matched: None,
            method_mismatch: !self.allowed_methods_normalized(method, &host, path).is_empty(),
        })
    }

    /// Methods other than `method` that would accept this host and path.
    pub fn allowed_methods(&self, method: &Method, host: &str, path: &str) -> Vec<Method> {
        self.allowed_methods_normalized(method, &normalize_host(host), path)
    }

    fn allowed_methods_normalized(&self, method: &Method, host: &str, path: &str) -> Vec<Method> {
        let mut allowed: Vec<Method> = self
            .tables
            .iter()
            .filter(|(m, _)| *m != method)
            .filter(|(_, table)| {
                table.candidates().any(|entry| {
                    entry.route.matcher().matches(host, path).is_some_and(|params| {
                        constraint::evaluate(entry.route.constraints(), &self.patterns, &params)
                            .unwrap_or(false)
                    })
                })
            })
            .map(|(m, _)| m.clone())
            .collect();
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        allowed
    }
}
