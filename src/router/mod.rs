//! Request routing: map slash-delimited paths onto registered controllers.
//!
//! Routes are templates such as `widgets/{{id}}/parts`. They are stored in a
//! segment trie ([`RouteNode`]) rooted at `/`:
//!
//! | Template             | Matches             | Captured params   |
//! |----------------------|---------------------|-------------------|
//! | `widgets`            | `widgets`           | *(none)*          |
//! | `widgets/{{id}}`     | `widgets/42`        | `id → "42"`       |
//! | `widgets/new`        | `widgets/new`       | *(none)*, beats `widgets/{{id}}` |
//!
//! Route shape is strict: no leading, trailing or doubled slashes, and no
//! blank routes. Registering the same segment sequence twice is a conflict.
//! The router is built during a registration phase and is read-only while
//! serving.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::controller::Controller;

mod template;
mod trie;

pub use template::{TemplateError, detemplate};
pub use trie::{PLACEHOLDER_CLOSE, PLACEHOLDER_OPEN, Route, RouteNode};

/// Path separator for routes and request paths.
pub const SLASH: &str = "/";

/// Errors raised while registering or resolving routes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("invalid route format '{route}'. Remove leading, trailing, and double slashes")]
    InvalidRoute { route: String },

    #[error("controller already present at route '{route}' ({existing})")]
    Conflict { route: String, existing: String },

    #[error("no route defined for path '{path}'")]
    NoRoute { path: String },
}

/// Owns the route trie and a log of every registration attempt.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use quimby::context::Context;
/// use quimby::controller::Controller;
/// use quimby::router::Router;
///
/// struct Widgets;
///
/// impl Controller for Widgets {
///     fn routes(&self) -> Vec<String> {
///         vec!["widgets".into(), "widgets/{{id}}".into()]
///     }
///     fn authenticate(&self, _ctx: &Context) -> bool {
///         true
///     }
/// }
///
/// let mut router = Router::new(None);
/// router.add_controller(Arc::new(Widgets)).unwrap();
///
/// let route = router.find_route_for_path("widgets/42").unwrap();
/// assert_eq!(route.template(), "widgets/{{id}}");
/// assert!(router.find_route_for_path("gadgets").is_err());
/// ```
pub struct Router {
    root: RouteNode,
    registered_routes: Vec<String>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Router {
    /// Creates a router whose root (`/`, the empty path) is bound to
    /// `root_controller` when one is given.
    pub fn new(root_controller: Option<Arc<dyn Controller>>) -> Self {
        let mut root = RouteNode::new(SLASH);
        if let Some(controller) = root_controller {
            root.bind(Route::new(SLASH, controller));
        }
        Self {
            root,
            registered_routes: Vec::new(),
        }
    }

    /// Registers every route the controller declares.
    ///
    /// Stops at the first failure. Routes registered before the failure stay
    /// registered; there is no rollback.
    pub fn add_controller(&mut self, controller: Arc<dyn Controller>) -> Result<(), RouterError> {
        for route in controller.routes() {
            self.add_route(&route, Arc::clone(&controller))?;
        }
        Ok(())
    }

    /// Binds `controller` at `route`. This does not register the routes the
    /// controller itself declares.
    ///
    /// The attempt is appended to [`registered_routes`](Self::registered_routes)
    /// whether or not it succeeds.
    pub fn add_route(
        &mut self,
        route: &str,
        controller: Arc<dyn Controller>,
    ) -> Result<(), RouterError> {
        let route = route.trim();
        self.registered_routes.push(route.to_owned());

        let segments: Vec<&str> = route.split(SLASH).collect();
        if route.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(RouterError::InvalidRoute {
                route: route.to_owned(),
            });
        }

        self.root.insert(&segments, route, controller)?;
        debug!(route, "route registered");
        Ok(())
    }

    /// Resolves a cleaned path (no query string, no outer slashes).
    ///
    /// The empty path resolves to the root. Anything that ends on a node
    /// without a controller, or falls off the trie, is
    /// [`RouterError::NoRoute`]; a partial match is never returned.
    pub fn find_route_for_path(&self, path: &str) -> Result<&Route, RouterError> {
        let node = if path.is_empty() {
            Some(&self.root)
        } else {
            let segments: Vec<&str> = path.split(SLASH).collect();
            self.root.find(&segments)
        };

        node.and_then(RouteNode::route)
            .ok_or_else(|| RouterError::NoRoute {
                path: path.to_owned(),
            })
    }

    pub fn root(&self) -> &RouteNode {
        &self.root
    }

    /// Every route string passed to [`add_route`](Self::add_route), in order.
    pub fn registered_routes(&self) -> &[String] {
        &self.registered_routes
    }
}
