//! Per-request dispatch and response finalization.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::error;

use super::access_log::{AccessEntry, AccessLog, TracingAccessLog};
use crate::context::{Context, Model};
use crate::controller::{Controller, HEALTH_CHECK_ROUTE, method_not_allowed};
use crate::error::RestError;
use crate::http::{CONTENT_TYPE_JSON, Method, Request, Response, StatusCode};
use crate::router::{Router, RouterError};

/// Binds a [`Router`] to the request/response cycle.
///
/// For each request the dispatcher builds a [`Context`], invokes the matched
/// controller's verb handler when the context carries no error, then
/// serializes the outcome and reports it to the [`AccessLog`].
pub struct Dispatcher {
    router: Router,
    access_log: Arc<dyn AccessLog>,
}

impl Dispatcher {
    /// A dispatcher whose router has `root` bound at the empty path.
    pub fn new(root: Option<Arc<dyn Controller>>) -> Self {
        Self::with_router(Router::new(root))
    }

    pub fn with_router(router: Router) -> Self {
        Self {
            router,
            access_log: Arc::new(TracingAccessLog),
        }
    }

    #[must_use]
    pub fn with_access_log(mut self, access_log: Arc<dyn AccessLog>) -> Self {
        self.access_log = access_log;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    /// Registers every route of `controller`. See [`Router::add_controller`].
    pub fn add_controller(&mut self, controller: Arc<dyn Controller>) -> Result<(), RouterError> {
        self.router.add_controller(controller)
    }

    /// Runs `request` through the context lifecycle and the matched verb
    /// handler, then finalizes the response.
    pub fn dispatch(&self, request: Request, remote_addr: Option<SocketAddr>) -> Response {
        let mut ctx = Context::new(request, remote_addr, &self.router);

        if !ctx.has_error() {
            if let Some(controller) = ctx.route().map(|route| Arc::clone(route.controller())) {
                invoke(controller.as_ref(), &mut ctx);
            }
        }

        self.complete_request(ctx)
    }

    /// Serializes the context's error or model and emits the access log.
    ///
    /// Text passed to [`Context::write`] always comes first. Without an
    /// explicit `Content-Type` it is followed by the error (or else the
    /// model) as JSON; a serialization failure becomes `system-error` / 500.
    /// With one, it is followed by the error message or the text model,
    /// unenveloped.
    pub fn complete_request(&self, mut ctx: Context) -> Response {
        let (headers, written) = ctx.take_response();
        let raw = headers.contains("content-type");

        let body = if raw {
            raw_body(&mut ctx, written)
        } else {
            json_body(&mut ctx, written)
        };

        if ctx.path() != HEALTH_CHECK_ROUTE {
            let request = ctx.request();
            self.access_log.record(&AccessEntry {
                remote_addr: ctx.remote_addr(),
                method: request.method(),
                uri: request.target(),
                protocol: request.protocol(),
                query: ctx.query_parameters(),
                body: if raw { None } else { ctx.cached_body() },
                status: ctx.status(),
                user_agent: request.user_agent(),
                referer: request.referer(),
            });
        }

        let response = Response::new(ctx.status()).headers(headers);
        let response = if raw {
            response
        } else {
            response.header("Content-Type", CONTENT_TYPE_JSON)
        };
        response.body_bytes(body)
    }
}

fn invoke(controller: &dyn Controller, ctx: &mut Context) {
    match ctx.method() {
        Method::Get => controller.get(ctx),
        Method::Post => controller.post(ctx),
        Method::Put => controller.put(ctx),
        Method::Patch => controller.patch(ctx),
        Method::Delete => controller.delete(ctx),
        Method::Options => controller.options(ctx),
        _ => method_not_allowed(ctx),
    }
}

fn json_body(ctx: &mut Context, mut body: Vec<u8>) -> Vec<u8> {
    let encoded = match ctx.error() {
        Some(err) => serde_json::to_vec(err),
        None => match ctx.take_model() {
            Some(model) => model.into_json(),
            None => serde_json::to_vec(&serde_json::Value::Null),
        },
    };

    let encoded = match encoded {
        Ok(encoded) => encoded,
        Err(e) => {
            error!(uri = %ctx.uri(), error = %e, "failed to serialize response");
            system_error(ctx);
            serde_json::to_vec(&RestError::system()).unwrap_or_default()
        }
    };
    body.extend_from_slice(&encoded);
    body
}

fn raw_body(ctx: &mut Context, mut body: Vec<u8>) -> Vec<u8> {
    if let Some(err) = ctx.error() {
        body.extend_from_slice(err.message.as_bytes());
        return body;
    }

    match ctx.take_model() {
        None => {}
        Some(Model::Text(text)) => body.extend_from_slice(text.as_bytes()),
        Some(_) => {
            error!(uri = %ctx.uri(), "non-text model set on a response with an explicit content type");
            system_error(ctx);
        }
    }
    body
}

fn system_error(ctx: &mut Context) {
    ctx.set_error(RestError::system(), StatusCode::InternalServerError);
}
