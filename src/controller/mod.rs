//! Controllers: the handlers a [`Router`](crate::router::Router) binds to routes.
//!
//! A controller declares the route templates it serves, decides whether a
//! request is authenticated, and implements any of the six verbs it
//! supports. Verbs left at their default answer `405 Method Not Allowed`.

use crate::context::Context;
use crate::error::{ErrorCode, RestError};
use crate::http::StatusCode;

mod health;

pub use health::{HEALTH_CHECK_ROUTE, HealthCheckController, HealthCheckResource};

/// Records `method-not-allowed` / 405 on the context.
pub fn method_not_allowed(ctx: &mut Context) {
    ctx.set_error(
        RestError::new(ErrorCode::MethodNotAllowed, ""),
        StatusCode::MethodNotAllowed,
    );
}

/// A request handler bound to one or more route templates.
///
/// Controllers are shared across connection tasks, so they must be
/// `Send + Sync`; any mutable state they keep is theirs to guard.
///
/// # Examples
///
/// ```
/// use quimby::context::Context;
/// use quimby::controller::Controller;
/// use quimby::http::StatusCode;
///
/// struct Version;
///
/// impl Controller for Version {
///     fn routes(&self) -> Vec<String> {
///         vec!["version".into()]
///     }
///
///     fn authenticate(&self, _ctx: &Context) -> bool {
///         true
///     }
///
///     fn get(&self, ctx: &mut Context) {
///         ctx.set_response("1.4.2", StatusCode::Ok);
///     }
/// }
/// ```
pub trait Controller: Send + Sync {
    /// Route templates registered by [`Router::add_controller`](crate::router::Router::add_controller).
    fn routes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Decides whether the request may proceed. Not consulted for `OPTIONS`.
    fn authenticate(&self, ctx: &Context) -> bool;

    /// A label for diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn get(&self, ctx: &mut Context) {
        method_not_allowed(ctx);
    }

    fn post(&self, ctx: &mut Context) {
        method_not_allowed(ctx);
    }

    fn put(&self, ctx: &mut Context) {
        method_not_allowed(ctx);
    }

    fn patch(&self, ctx: &mut Context) {
        method_not_allowed(ctx);
    }

    fn delete(&self, ctx: &mut Context) {
        method_not_allowed(ctx);
    }

    fn options(&self, ctx: &mut Context) {
        method_not_allowed(ctx);
    }
}
