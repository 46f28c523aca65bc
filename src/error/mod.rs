//! Error handling subsystem.
//!
//! # Data Flow
//! ```text
//! Handler / extractor / panic
//!     → AppError (tagged: Http | Business | Internal)
//!     → IntoResponse tags the response with a `Failure` marker
//!     → interceptor observes the marker (logs, never alters)
//!     → normalizer.rs turns the marker into an ErrorEnvelope
//!     → envelope.rs serializes it as the response body
//! ```
//!
//! # Design Decisions
//! - Classification is an exhaustive match on the variant, never a type probe
//! - Precedence when two interpretations are possible: Http > Business > Internal
//! - Status codes for categories come from taxonomy.rs only

pub mod envelope;
pub mod normalizer;
pub mod taxonomy;

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use envelope::ErrorEnvelope;
pub use normalizer::{normalize_errors, ErrorNormalizer, RequestMeta};
pub use taxonomy::ErrorKind;

/// Client-facing message: a single string or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Single(String),
    Many(Vec<String>),
}

impl Message {
    /// Messages joined for log lines.
    pub fn joined(&self) -> String {
        match self {
            Message::Single(s) => s.clone(),
            Message::Many(items) => items.join("; "),
        }
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::Single(value.to_string())
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::Single(value)
    }
}

impl From<Vec<String>> for Message {
    fn from(value: Vec<String>) -> Self {
        Message::Many(value)
    }
}

/// An error raised deliberately with its HTTP status already decided.
#[derive(Debug, Clone)]
pub struct HttpException {
    pub status: StatusCode,
    pub message: Message,
    /// Category label; derived from the status when absent.
    pub error: Option<String>,
    pub details: Option<Value>,
}

impl HttpException {
    pub fn new(status: StatusCode, message: impl Into<Message>) -> Self {
        Self {
            status,
            message: message.into(),
            error: None,
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// A domain-rule violation raised by application code.
#[derive(Debug, Clone)]
pub struct BusinessException {
    pub kind: ErrorKind,
    pub message: Message,
    pub details: Option<Value>,
    /// Status fixed at construction, overriding the kind's status.
    pub status_override: Option<StatusCode>,
}

impl BusinessException {
    pub fn new(kind: ErrorKind, message: impl Into<Message>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            status_override: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status_override.unwrap_or_else(|| self.kind.status())
    }
}

/// One invalid input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every failure a request handler can surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Pass-through: status and body decided at the raise site.
    #[error("HTTP {}: {}", .0.status, .0.message.joined())]
    Http(HttpException),

    #[error("{:?}: {}", .0.kind, .0.message.joined())]
    Business(BusinessException),

    /// Anything else, including caught panics. Never shown to clients.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn http(status: StatusCode, message: impl Into<Message>) -> Self {
        AppError::Http(HttpException::new(status, message))
    }

    pub fn business(kind: ErrorKind, message: impl Into<Message>) -> Self {
        AppError::Business(BusinessException::new(kind, message))
    }

    /// Input validation failure carrying per-field details.
    pub fn validation(fields: Vec<FieldError>) -> Self {
        let details = serde_json::to_value(&fields).unwrap_or(Value::Null);
        AppError::Business(BusinessException {
            kind: ErrorKind::Validation,
            message: ErrorKind::Validation.default_message().into(),
            details: Some(details),
            status_override: None,
        })
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        AppError::Business(BusinessException {
            kind: ErrorKind::NotFound,
            message: format!("{} with id {} not found", resource, id).into(),
            details: Some(json!({ "resource": resource, "id": id })),
            status_override: None,
        })
    }

    pub fn conflict(message: impl Into<Message>) -> Self {
        Self::business(ErrorKind::Conflict, message)
    }

    pub fn unauthorized() -> Self {
        Self::business(
            ErrorKind::Authentication,
            ErrorKind::Authentication.default_message(),
        )
    }

    pub fn forbidden() -> Self {
        Self::business(
            ErrorKind::Authorization,
            ErrorKind::Authorization.default_message(),
        )
    }

    pub fn tenant_denied(details: Value) -> Self {
        AppError::Business(BusinessException {
            kind: ErrorKind::Tenant,
            message: ErrorKind::Tenant.default_message().into(),
            details: Some(details),
            status_override: None,
        })
    }

    pub fn rate_limited() -> Self {
        Self::business(ErrorKind::RateLimit, ErrorKind::RateLimit.default_message())
    }

    /// Domain rule violation with an application-specific code.
    pub fn business_rule(code: &str, message: impl Into<Message>) -> Self {
        AppError::Business(BusinessException {
            kind: ErrorKind::BusinessRule,
            message: message.into(),
            details: Some(json!({ "code": code })),
            status_override: None,
        })
    }

    /// Status this error will be answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Http(e) => e.status,
            AppError::Business(e) => e.status(),
            AppError::Internal(_) => ErrorKind::Internal.status(),
        }
    }

    /// Taxonomy kind; pass-through errors have none.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Http(_) => None,
            AppError::Business(e) => Some(e.kind),
            AppError::Internal(_) => Some(ErrorKind::Internal),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::http(rejection.status(), rejection.body_text())
    }
}

/// Response extension marking a failed request.
///
/// Carries the original error from the handler to the normalizer.
#[derive(Debug, Clone)]
pub struct Failure(pub Arc<AppError>);

impl Failure {
    pub fn error(&self) -> &AppError {
        &self.0
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = self.status().into_response();
        response.extensions_mut().insert(Failure(Arc::new(self)));
        response
    }
}
