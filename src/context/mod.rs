//! Per-request context: routing outcome, body access and response state.
//!
//! A [`Context`] is built once per request by [`Context::new`], which runs the
//! request through a short pipeline:
//!
//! 1. **parse** the query string: failure is `malformed-url` / 400
//! 2. **route** the cleaned path: no match is `invalid-route` / 400
//! 3. **de-template** the matched route: a malformed template is
//!    `invalid-route` / 500
//! 4. **authenticate** (skipped for `OPTIONS`): refusal is
//!    `authentication-failed` / 401
//!
//! The first stage that fails records an error and the remaining stages do
//! not run. A context that carries an error is never dispatched to a verb
//! handler.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
};

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::error::{ErrorCode, FieldError, INVALID_CREDENTIALS_MESSAGE, RestError};
use crate::http::{
    CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, Headers, MalformedQuery, Method, Request, StatusCode,
    Values,
};
use crate::router::{Route, Router, detemplate};

mod form;

pub use form::{Field, FieldKind, FormError, FormModel, decode_values, underscore};

/// Type-erased request extensions map. Holds per-request state shared between
/// an `authenticate` implementation and the verb handlers that follow it.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value of the same type.
    pub fn insert<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn get_mut<T>(&mut self) -> Option<&mut T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|value| value.downcast_mut::<T>())
    }

    pub fn remove<T>(&mut self) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }
}

/// Wildcard values captured from the request path, keyed by placeholder name.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    map: HashMap<String, String>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.map.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A response model recorded by [`Context::set_response`].
///
/// Models are converted to JSON when they are set so the finalize step only
/// has to write bytes. Strings are kept as [`Model::Text`] so they can also be
/// written raw when the controller chose its own content type.
#[derive(Debug)]
pub enum Model {
    Text(String),
    Json(Value),
    /// Conversion failed; finalize replaces the response with `system-error`.
    Unserializable(serde_json::Error),
}

impl Model {
    pub fn from_serialize<T: Serialize + ?Sized>(model: &T) -> Self {
        match serde_json::to_value(model) {
            Ok(Value::String(text)) => Self::Text(text),
            Ok(value) => Self::Json(value),
            Err(e) => Self::Unserializable(e),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Encodes the model as a JSON document.
    pub fn into_json(self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Text(text) => serde_json::to_vec(&text),
            Self::Json(value) => serde_json::to_vec(&value),
            Self::Unserializable(e) => Err(e),
        }
    }
}

/// Failures reading the request body.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("request ({method} {path}) cannot be read as it has no content")]
    NoContent { method: String, path: String },

    #[error("missing content type")]
    MissingMediaType,

    #[error("unsupported content type ({media_type}) provided")]
    UnsupportedMediaType { media_type: String },

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("form body is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed form body: {0}")]
    MalformedForm(#[from] MalformedQuery),

    #[error("invalid form body: {0}")]
    Form(#[from] FormError),
}

/// The state of one request/response exchange.
pub struct Context {
    request: Request,
    remote_addr: Option<SocketAddr>,
    path: String,
    route: Option<Route>,
    uri_parameters: Parameters,
    query: Values,
    status: StatusCode,
    model: Option<Model>,
    error: Option<RestError>,
    response_headers: Headers,
    written: Vec<u8>,
    body: Option<Bytes>,
    extensions: Extensions,
}

impl Context {
    /// Builds the context for `request` and runs the parse, route,
    /// de-template and authenticate stages against `router`.
    pub fn new(request: Request, remote_addr: Option<SocketAddr>, router: &Router) -> Self {
        let mut ctx = Self::unrouted(request, remote_addr);
        ctx.resolve(router);
        ctx
    }

    /// A context with no routing performed: no route, no parameters, no
    /// query values. Useful for exercising handlers directly.
    pub fn unrouted(request: Request, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            request,
            remote_addr,
            path: String::new(),
            route: None,
            uri_parameters: Parameters::new(),
            query: Values::new(),
            status: StatusCode::Ok,
            model: None,
            error: None,
            response_headers: Headers::new(),
            written: Vec::new(),
            body: None,
            extensions: Extensions::new(),
        }
    }

    fn resolve(&mut self, router: &Router) {
        // take a hard stance on malformed query strings
        match Values::parse(self.request.query_string().unwrap_or_default()) {
            Ok(query) => self.query = query,
            Err(e) => {
                debug!(uri = %self.request.target(), error = %e, "malformed query string");
                let message = format!("Malformed URL Parameters '{}'.", self.request.target());
                self.set_error(
                    RestError::new(ErrorCode::MalformedUrl, message),
                    StatusCode::BadRequest,
                );
                return;
            }
        }

        self.path = self.request.path().trim_matches([' ', '/']).to_owned();

        let route = match router.find_route_for_path(&self.path) {
            Ok(route) => route.clone(),
            Err(e) => {
                debug!(error = %e, "route lookup failed");
                self.set_error(
                    RestError::new(ErrorCode::InvalidRoute, ""),
                    StatusCode::BadRequest,
                );
                return;
            }
        };
        let controller = Arc::clone(route.controller());
        let template = route.template().to_owned();
        self.route = Some(route);

        if !self.path.trim().is_empty() {
            match detemplate(&template, &self.path) {
                Ok(params) => self.uri_parameters = params,
                Err(e) => {
                    error!(error = %e, "registered route template is unusable");
                    self.set_error(
                        RestError::new(ErrorCode::InvalidRoute, ""),
                        StatusCode::InternalServerError,
                    );
                    return;
                }
            }
        }

        if !self.request.method().is_preflight() && !controller.authenticate(self) {
            self.set_error(
                RestError::new(ErrorCode::AuthenticationFailed, INVALID_CREDENTIALS_MESSAGE),
                StatusCode::Unauthorized,
            );
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// The request target as received, query string included.
    pub fn uri(&self) -> &str {
        self.request.target()
    }

    /// The routed path: query string removed, outer slashes and spaces trimmed.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// The route this request resolved to, if routing succeeded.
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn uri_parameters(&self) -> &Parameters {
        &self.uri_parameters
    }

    pub fn query_parameters(&self) -> &Values {
        &self.query
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&RestError> {
        self.error.as_ref()
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    /// Records `error` and `status`, replacing any model or error already set.
    pub fn set_error(&mut self, error: RestError, status: StatusCode) {
        self.status = status;
        self.model = None;
        self.error = Some(error);
    }

    /// Appends a field-level detail, first setting a `validation-error` / 400
    /// when no error is present yet.
    pub fn add_error(&mut self, field_error: FieldError) {
        if !self.has_error() {
            self.set_error(
                RestError::new(ErrorCode::ValidationError, ""),
                StatusCode::BadRequest,
            );
        }
        if let Some(error) = self.error.as_mut() {
            error.add_detail(field_error);
        }
    }

    /// Records `model` and `status` unless an error is already set.
    ///
    /// Returns `false` and leaves the context untouched when an error exists.
    pub fn set_response<T: Serialize + ?Sized>(&mut self, model: &T, status: StatusCode) -> bool {
        if self.has_error() {
            return false;
        }
        self.status = status;
        self.model = Some(Model::from_serialize(model));
        true
    }

    /// Sets a response header. Setting `Content-Type` switches finalize from
    /// the JSON envelope to writing the body raw.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.response_headers.set(name, value);
    }

    pub fn response_headers(&self) -> &Headers {
        &self.response_headers
    }

    /// Appends raw text to the response body.
    pub fn write(&mut self, text: &str) {
        self.written.extend_from_slice(text.as_bytes());
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// The request body if [`read`](Self::read) has already consumed it.
    pub fn cached_body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Returns the request body, reading it from the request only once.
    ///
    /// A declared `Content-Length` of zero, a negative one, or none at all is
    /// [`ContextError::NoContent`]. A body shorter than declared is returned
    /// as-is with a warning.
    pub fn read(&mut self) -> Result<Bytes, ContextError> {
        if let Some(body) = &self.body {
            return Ok(body.clone());
        }

        let declared = self.request.content_length().unwrap_or(0);
        if declared <= 0 {
            return Err(ContextError::NoContent {
                method: self.request.method().to_string(),
                path: self.request.path().to_owned(),
            });
        }

        let declared = usize::try_from(declared).unwrap_or(usize::MAX);
        let mut body = self.request.take_body();
        if body.len() < declared {
            warn!(
                uri = %self.request.target(),
                remote = ?self.remote_addr,
                declared,
                actual = body.len(),
                "content length mismatch with actual body length"
            );
        } else {
            body.truncate(declared);
        }

        self.body = Some(body.clone());
        Ok(body)
    }

    /// Decodes the body into `T` according to the request `Content-Type`.
    ///
    /// `application/json` goes through `serde_json`;
    /// `application/x-www-form-urlencoded` goes through the model's field
    /// table. Any other or missing type, and any decode failure, also records
    /// `validation-error` / 406 on the context. A missing body is returned
    /// without touching the context.
    pub fn read_object<T: FormModel>(&mut self) -> Result<T, ContextError> {
        let body = self.read()?;

        let result = match self.request.headers().media_type().as_deref() {
            Some(CONTENT_TYPE_JSON) => serde_json::from_slice(&body).map_err(ContextError::from),
            Some(CONTENT_TYPE_FORM) => read_form(&body),
            Some(other) => Err(ContextError::UnsupportedMediaType {
                media_type: other.to_owned(),
            }),
            None => Err(ContextError::MissingMediaType),
        };

        if let Err(e) = &result {
            self.set_error(
                RestError::new(ErrorCode::ValidationError, e.to_string()),
                StatusCode::NotAcceptable,
            );
        }
        result
    }

    /// Maps the query parameters onto `T` using its field table.
    pub fn read_query_params<T: FormModel>(&self) -> Result<T, FormError> {
        decode_values(&self.query)
    }

    pub(crate) fn take_model(&mut self) -> Option<Model> {
        self.model.take()
    }

    pub(crate) fn take_response(&mut self) -> (Headers, Vec<u8>) {
        (
            std::mem::take(&mut self.response_headers),
            std::mem::take(&mut self.written),
        )
    }
}

fn read_form<T: FormModel>(body: &[u8]) -> Result<T, ContextError> {
    let values = Values::parse(std::str::from_utf8(body)?)?;
    Ok(decode_values(&values)?)
}

#[cfg(test)]
mod tests;
