//! Error taxonomy.
//!
//! # Responsibilities
//! - Define the closed set of failure categories
//! - Map each category to its HTTP status, default message and stable code
//!
//! # Design Decisions
//! - This table is the only place a status is assigned to a category;
//!   constructors and the normalizer both read it from here
//! - Codes are SCREAMING_SNAKE_CASE and never change once published

use axum::http::StatusCode;
use serde::Serialize;

/// Category of a failure surfaced to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    NotFound,
    Conflict,
    Tenant,
    RateLimit,
    BusinessRule,
    Internal,
}

impl ErrorKind {
    /// Every kind, in table order.
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::Validation,
        ErrorKind::Authentication,
        ErrorKind::Authorization,
        ErrorKind::NotFound,
        ErrorKind::Conflict,
        ErrorKind::Tenant,
        ErrorKind::RateLimit,
        ErrorKind::BusinessRule,
        ErrorKind::Internal,
    ];

    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Tenant => StatusCode::FORBIDDEN,
            ErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::BusinessRule => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Validation => "Validation failed",
            ErrorKind::Authentication => "Unauthorized",
            ErrorKind::Authorization => "Forbidden",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Tenant => "Tenant access denied",
            ErrorKind::RateLimit => "Too Many Requests",
            ErrorKind::BusinessRule => "Bad Request",
            ErrorKind::Internal => "Internal Server Error",
        }
    }

    /// Machine-readable code, stable across releases.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Authentication => "AUTHENTICATION_ERROR",
            ErrorKind::Authorization => "AUTHORIZATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Tenant => "TENANT_ERROR",
            ErrorKind::RateLimit => "RATE_LIMIT_EXCEEDED",
            ErrorKind::BusinessRule => "BUSINESS_RULE_VIOLATION",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

/// Human-readable category label for a status (`"Not Found"`, ...).
pub fn status_label(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Error").to_string()
}
