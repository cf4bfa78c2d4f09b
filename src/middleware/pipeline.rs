//! Prebuilt middleware pipelines.

use std::sync::Arc;

use crate::http::context::RequestContext;
use crate::middleware::{Endpoint, MiddlewareRef, Next, RouteResult};

/// A frozen, priority-sorted middleware stack.
///
/// Cheap to clone; clones share the same stack.
#[derive(Clone)]
pub struct Pipeline {
    stack: Arc<[MiddlewareRef]>,
}

impl Pipeline {
    pub fn new(stack: Arc<[MiddlewareRef]>) -> Self {
        Self { stack }
    }

    pub fn names(&self) -> Vec<&str> {
        self.stack.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// True if both pipelines run the same stack object.
    pub fn shares_stack(&self, other: &Pipeline) -> bool {
        Arc::ptr_eq(&self.stack, &other.stack)
    }

    /// Run the stack around `endpoint`.
    pub async fn run(&self, ctx: RequestContext, endpoint: &dyn Endpoint) -> RouteResult {
        Next::new(&self.stack, endpoint).run(ctx).await
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
