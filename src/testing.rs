//! Helpers for exercising controllers without a socket.

use std::sync::Arc;

use serde::Serialize;

use crate::context::Context;
use crate::controller::Controller;
use crate::http::{CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, Method, Request};
use crate::router::Router;

/// Builds a request for `target` with no body.
///
/// # Panics
///
/// Panics if `target` cannot appear in a request line (e.g. contains spaces).
pub fn request(method: Method, target: &str) -> Request {
    raw_request(method, target, &[], b"")
}

/// Builds a request carrying `body` under the given content type and a
/// matching `Content-Length`.
pub fn request_with_body(method: Method, target: &str, content_type: &str, body: &[u8]) -> Request {
    let length = body.len().to_string();
    raw_request(
        method,
        target,
        &[("Content-Type", content_type), ("Content-Length", &length)],
        body,
    )
}

/// Builds a request whose body is `data` encoded as JSON.
pub fn json_request<T: Serialize + ?Sized>(method: Method, target: &str, data: &T) -> Request {
    let body = serde_json::to_vec(data).expect("test payload serializes");
    request_with_body(method, target, CONTENT_TYPE_JSON, &body)
}

/// Builds a request with an `application/x-www-form-urlencoded` body.
pub fn form_request(method: Method, target: &str, form: &str) -> Request {
    request_with_body(method, target, CONTENT_TYPE_FORM, form.as_bytes())
}

/// Builds a request from explicit headers and body bytes. The body is
/// attached as-is; no `Content-Length` is added.
pub fn raw_request(method: Method, target: &str, headers: &[(&str, &str)], body: &[u8]) -> Request {
    let mut head = format!("{method} {target} HTTP/1.1\r\nHost: localhost\r\n");
    for (name, value) in headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    let (request, _) = Request::parse(head.as_bytes()).expect("test request head parses");
    request.with_body(body.to_vec())
}

/// Runs `request` through the full context lifecycle against a router whose
/// root is `controller` and which also registers the controller's routes.
pub fn context_for(controller: impl Controller + 'static, request: Request) -> Context {
    let controller: Arc<dyn Controller> = Arc::new(controller);
    let mut router = Router::new(Some(Arc::clone(&controller)));
    router
        .add_controller(controller)
        .expect("test controller routes register");
    Context::new(request, None, &router)
}
