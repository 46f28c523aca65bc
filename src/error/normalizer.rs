//! Global error normalization.
//!
//! # Responsibilities
//! - Classify every failure reaching the HTTP boundary
//! - Build exactly one `ErrorEnvelope` per failed request
//! - Log the failure once, at error level, before responding
//! - Wrap framework-generated error responses in the same envelope
//!
//! # Design Decisions
//! - Internal errors are answered with a fixed message; details stay in logs
//! - Building the envelope is total: missing correlation id becomes "unknown",
//!   serialization problems degrade to a hardcoded body

use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode, Uri},
    middleware::Next,
    response::Response,
};

use crate::error::envelope::UNKNOWN_CORRELATION_ID;
use crate::error::taxonomy::{status_label, ErrorKind};
use crate::error::{AppError, ErrorEnvelope, Failure, HttpException, Message};
use crate::observability::logger::{ErrorTrace, LogContext, StructuredLogger};
use crate::observability::{metrics, CorrelationId};

/// Message sent to clients for any unclassified failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// What the normalizer needs to know about the failed request.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: String,
    pub path: String,
    pub correlation_id: Option<CorrelationId>,
}

impl RequestMeta {
    pub fn from_request<B>(request: &axum::http::Request<B>) -> Self {
        Self {
            method: request.method().to_string(),
            path: request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| request.uri().path().to_string()),
            correlation_id: CorrelationId::from_extensions(request.extensions()),
        }
    }

    fn correlation_str(&self) -> &str {
        self.correlation_id
            .as_ref()
            .map(CorrelationId::as_str)
            .unwrap_or(UNKNOWN_CORRELATION_ID)
    }
}

#[derive(Clone)]
pub struct ErrorNormalizer {
    logger: StructuredLogger,
}

impl ErrorNormalizer {
    pub fn new(logger: StructuredLogger) -> Self {
        Self {
            logger: logger.scoped("ErrorNormalizer"),
        }
    }

    /// Build the envelope for `error` and log it.
    pub fn normalize(&self, error: &AppError, meta: &RequestMeta) -> ErrorEnvelope {
        let (status, message, label, details, trace) = match error {
            AppError::Http(e) => (
                e.status,
                e.message.clone(),
                e.error.clone().unwrap_or_else(|| status_label(e.status)),
                e.details.clone(),
                None,
            ),
            AppError::Business(e) => {
                let status = e.status();
                (status, e.message.clone(), status_label(status), e.details.clone(), None)
            }
            AppError::Internal(e) => {
                let status = ErrorKind::Internal.status();
                (
                    status,
                    Message::from(INTERNAL_ERROR_MESSAGE),
                    status_label(status),
                    None,
                    Some(ErrorTrace::from_anyhow(e)),
                )
            }
        };

        let code = error.kind().map(ErrorKind::code).unwrap_or("HTTP_EXCEPTION");
        metrics::record_error(code);

        let log_message = match &trace {
            Some(t) => t.message.clone(),
            None => message.joined(),
        };
        self.logger.error(
            log_message,
            LogContext::new()
                .with("correlationId", meta.correlation_str())
                .with("method", meta.method.as_str())
                .with("url", meta.path.as_str())
                .with("statusCode", status.as_u16())
                .with("code", code),
            trace,
        );

        ErrorEnvelope {
            status_code: status.as_u16(),
            message,
            error: label,
            details,
            timestamp: ErrorEnvelope::now(),
            path: meta.path.clone(),
            correlation_id: meta.correlation_str().to_string(),
        }
    }

    /// Rewrite `response` into an envelope if it represents a failure.
    pub fn handle(&self, response: Response, meta: &RequestMeta) -> Response {
        if let Some(failure) = response.extensions().get::<Failure>().cloned() {
            return self.normalize(failure.error(), meta).into_response();
        }

        let status = response.status();
        if is_error(status) && !is_json(&response) {
            let error = AppError::Http(HttpException::new(status, status_label(status)));
            return self.normalize(&error, meta).into_response();
        }

        response
    }
}

fn is_error(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// Middleware applying [`ErrorNormalizer::handle`] to every response.
pub async fn normalize_errors(
    State(normalizer): State<ErrorNormalizer>,
    request: Request,
    next: Next,
) -> Response {
    let meta = RequestMeta::from_request(&request);
    let response = next.run(request).await;
    normalizer.handle(response, &meta)
}

/// Router fallback for unmatched paths.
pub async fn route_not_found(method: Method, uri: Uri) -> AppError {
    AppError::http(
        StatusCode::NOT_FOUND,
        format!("Cannot {} {}", method, uri.path()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BusinessException, FieldError};
    use crate::observability::{LogLevel, MemorySink};
    use axum::response::IntoResponse;
    use serde_json::json;
    use std::sync::Arc;

    fn normalizer() -> (ErrorNormalizer, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (ErrorNormalizer::new(StructuredLogger::new(sink.clone())), sink)
    }

    fn meta(correlation: Option<&str>) -> RequestMeta {
        let mut req = axum::http::Request::builder()
            .uri("/api/entities/entity-999?expand=true")
            .body(())
            .unwrap();
        if let Some(id) = correlation {
            req.headers_mut()
                .insert(crate::observability::CORRELATION_ID_HEADER, id.parse().unwrap());
            crate::observability::correlation::ensure(&mut req);
        }
        RequestMeta::from_request(&req)
    }

    #[test]
    fn test_pass_through_preserved() {
        let (n, _) = normalizer();
        let err = AppError::http(StatusCode::FORBIDDEN, "Project is archived");
        let env = n.normalize(&err, &meta(Some("c-1")));
        assert_eq!(env.status_code, 403);
        assert_eq!(env.message, Message::from("Project is archived"));
        assert_eq!(env.error, "Forbidden");
        assert_eq!(env.path, "/api/entities/entity-999?expand=true");
        assert_eq!(env.correlation_id, "c-1");
    }

    #[test]
    fn test_pass_through_message_list() {
        let (n, _) = normalizer();
        let err = AppError::http(
            StatusCode::BAD_REQUEST,
            vec!["name is required".to_string(), "slug is invalid".to_string()],
        );
        let env = n.normalize(&err, &meta(None));
        assert_eq!(env.message, Message::Many(vec!["name is required".into(), "slug is invalid".into()]));
    }

    #[test]
    fn test_business_error_surfaces_details() {
        let (n, _) = normalizer();
        let err = AppError::validation(vec![FieldError::new("name", "name must not be empty")]);
        let env = n.normalize(&err, &meta(None));
        assert_eq!(env.status_code, 422);
        assert_eq!(env.message, Message::from("Validation failed"));
        assert_eq!(env.details.unwrap()[0]["field"], "name");
    }

    #[test]
    fn test_business_status_override() {
        let (n, _) = normalizer();
        let mut e = BusinessException::new(ErrorKind::BusinessRule, "Plan limit reached");
        e.status_override = Some(StatusCode::PAYMENT_REQUIRED);
        let env = n.normalize(&AppError::Business(e), &meta(None));
        assert_eq!(env.status_code, 402);
        assert_eq!(env.error, "Payment Required");
    }

    #[test]
    fn test_internal_error_not_leaked() {
        let (n, sink) = normalizer();
        let err = AppError::from(anyhow::anyhow!("connection refused: postgres://admin:secret@db"));
        let env = n.normalize(&err, &meta(Some("c-9")));

        assert_eq!(env.status_code, 500);
        assert_eq!(env.message, Message::from(INTERNAL_ERROR_MESSAGE));
        assert!(env.details.is_none());
        let body = serde_json::to_string(&env).unwrap();
        assert!(!body.contains("secret"));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, LogLevel::Error);
        assert!(records[0].message.contains("connection refused"));
        assert_eq!(records[0].context.get_str("correlationId"), Some("c-9"));
        assert!(records[0].context.get_str("stack").is_some());
    }

    #[test]
    fn test_missing_correlation_is_unknown() {
        let (n, _) = normalizer();
        let env = n.normalize(&AppError::forbidden(), &meta(None));
        assert_eq!(env.correlation_id, "unknown");
    }

    #[test]
    fn test_handle_wraps_framework_error() {
        let (n, _) = normalizer();
        let response = (StatusCode::REQUEST_TIMEOUT, "").into_response();
        let response = n.handle(response, &meta(None));
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_handle_leaves_success_and_json_errors() {
        let (n, sink) = normalizer();
        let ok = n.handle(StatusCode::OK.into_response(), &meta(None));
        assert_eq!(ok.status(), StatusCode::OK);

        let json_err = (StatusCode::BAD_REQUEST, axum::Json(json!({ "custom": true }))).into_response();
        let json_err = n.handle(json_err, &meta(None));
        assert_eq!(json_err.status(), StatusCode::BAD_REQUEST);
        assert!(sink.records().is_empty());
    }
}
