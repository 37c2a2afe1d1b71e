//! Route lookup.
//!
//! # Responsibilities
//! - Store registered routes in registration order
//! - Look up the first route whose pattern matches a path
//! - Return the matched route with its parameters, or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in registration order; overlapping patterns resolve to
//!   whichever was declared first

use std::sync::Arc;

use crate::routing::matcher::{match_path, RouteParams};
use crate::routing::route::Route;

/// Ordered set of page routes.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes: routes.into_iter().map(Arc::new).collect(),
        }
    }

    /// First route matching `path`, with its captured parameters.
    pub fn resolve(&self, path: &str) -> Option<(Arc<Route>, RouteParams)> {
        self.routes.iter().find_map(|route| {
            match_path(route.path(), path).map(|params| (Arc::clone(route), params))
        })
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
