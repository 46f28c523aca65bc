//! Canonical error response body.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Message;
use crate::observability::correlation::CORRELATION_ID_HEADER;

/// Literal used when no correlation id could be resolved.
pub const UNKNOWN_CORRELATION_ID: &str = "unknown";

/// Last-resort body when the envelope itself cannot be serialized.
const FALLBACK_BODY: &str = r#"{"statusCode":500,"message":"Internal server error","error":"Internal Server Error","correlationId":"unknown"}"#;

/// The single JSON shape returned for every failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub message: Message,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: String,
    pub path: String,
    pub correlation_id: String,
}

impl ErrorEnvelope {
    /// Current time as ISO-8601 with millisecond precision.
    pub fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Serialize into an HTTP response with the envelope's status.
    ///
    /// Never fails: serialization errors degrade to a fixed 500 body.
    pub fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let correlation = HeaderValue::from_str(&self.correlation_id).ok();

        let (status, body) = match serde_json::to_vec(&self) {
            Ok(bytes) => (status, Body::from(bytes)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize error envelope");
                (StatusCode::INTERNAL_SERVER_ERROR, Body::from(FALLBACK_BODY))
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        if let Some(value) = correlation {
            response.headers_mut().insert(CORRELATION_ID_HEADER, value);
        }
        response
    }
}
