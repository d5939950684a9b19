//! Client-facing error payloads.
//!
//! Every terminal stage of a request records a [`RestError`] on the
//! [`Context`](crate::context::Context); the dispatcher serializes it as
//! `{ "code": ..., "message": ..., "details": [...] }`.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Fixed message returned with `authentication-failed`.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid Credentials";

/// The flat error taxonomy. Serialized in kebab-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// The verb is not implemented for the endpoint.
    MethodNotAllowed,
    /// The query string could not be decoded.
    #[serde(rename = "malformed-url")]
    MalformedUrl,
    /// No route matches, or the matched template is unusable.
    InvalidRoute,
    AuthenticationFailed,
    /// Authenticated but not permitted.
    NotAuthorized,
    /// Internal failure; never carries detail to the client.
    SystemError,
    NotFound,
    /// A validation rule was violated or the body could not be decoded.
    ValidationError,
    /// A required field was submitted blank.
    CannotBeBlank,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MethodNotAllowed => "method-not-allowed",
            Self::MalformedUrl => "malformed-url",
            Self::InvalidRoute => "invalid-route",
            Self::AuthenticationFailed => "authentication-failed",
            Self::NotAuthorized => "not-authorized",
            Self::SystemError => "system-error",
            Self::NotFound => "not-found",
            Self::ValidationError => "validation-error",
            Self::CannotBeBlank => "cannot-be-blank",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The standard error body.
///
/// # Examples
///
/// ```
/// use quimby::error::{ErrorCode, FieldError, RestError};
///
/// let mut err = RestError::new(ErrorCode::ValidationError, "");
/// err.add_detail(FieldError::new(ErrorCode::CannotBeBlank, "required", "name"));
///
/// let json = serde_json::to_string(&err).unwrap();
/// assert_eq!(
///     json,
///     r#"{"code":"validation-error","message":"","details":[{"code":"cannot-be-blank","message":"required","field":"name"}]}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{message} ({code})")]
pub struct RestError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Vec<Value>,
}

impl RestError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// The generic payload substituted when a response cannot be serialized.
    pub fn system() -> Self {
        Self::new(ErrorCode::SystemError, "")
    }

    /// Appends a structured detail, e.g. a [`FieldError`].
    pub fn add_detail(&mut self, detail: impl Into<Value>) {
        self.details.push(detail.into());
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.add_detail(detail);
        self
    }
}

/// A validation failure tied to one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub code: ErrorCode,
    pub message: String,
    pub field: String,
}

impl FieldError {
    pub fn new(code: ErrorCode, message: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: field.into(),
        }
    }
}

impl From<FieldError> for Value {
    fn from(err: FieldError) -> Value {
        serde_json::json!({
            "code": err.code.as_str(),
            "message": err.message,
            "field": err.field,
        })
    }
}
