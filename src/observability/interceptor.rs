//! Request/response observability middleware.
//!
//! # Responsibilities
//! - Emit one `http_request` record before the handler runs
//! - Emit one `http_response` record, or one `error` record on failure, after it
//! - Run the handler inside a span carrying the correlation id
//! - Record request metrics
//!
//! # Design Decisions
//! - Failures are observed through the `Failure` response marker and passed
//!   on untouched; turning them into envelopes is the normalizer's job
//! - Tenant and user are read from extensions set upstream, never computed here

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use crate::error::Failure;
use crate::observability::correlation;
use crate::observability::logger::{ErrorTrace, LogContext, StructuredLogger};
use crate::observability::metrics;
use crate::tenancy::{TenantContext, UserContext};

/// Client address: first `x-forwarded-for` hop, else the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

pub async fn observe_requests(
    State(logger): State<StructuredLogger>,
    mut request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let correlation_id = correlation::ensure(&mut request);

    let method = request.method().to_string();
    let url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let context = LogContext::new()
        .with("correlationId", correlation_id.as_str())
        .with_opt("ip", client_ip(request.headers(), peer))
        .with_opt(
            "userAgent",
            request
                .headers()
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok()),
        )
        .with_opt(
            "tenantId",
            request.extensions().get::<TenantContext>().map(|t| t.slug.clone()),
        )
        .with_opt(
            "userId",
            request.extensions().get::<UserContext>().map(|u| u.user_id.clone()),
        );

    logger.http_request(&method, &url, context.clone());

    let span = tracing::info_span!(
        "request",
        correlation_id = %correlation_id,
        method = %method,
        path = %request.uri().path(),
    );
    let response = next.run(request).instrument(span).await;

    let elapsed_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    match response.extensions().get::<Failure>() {
        Some(failure) => {
            let error = failure.error();
            let status = error.status();
            let trace = match error {
                crate::error::AppError::Internal(e) => ErrorTrace::from_anyhow(e),
                other => ErrorTrace::new(other.to_string()),
            };
            logger.error(
                format!("{} {} failed with {} - {}ms", method, url, status.as_u16(), elapsed_ms),
                context
                    .with("method", method.as_str())
                    .with("url", url.as_str())
                    .with("statusCode", status.as_u16())
                    .with("responseTime", elapsed_ms),
                Some(trace),
            );
            metrics::record_request(&method, status.as_u16(), start);
        }
        None => {
            logger.http_response(&method, &url, status.as_u16(), elapsed_ms, context);
            metrics::record_request(&method, status.as_u16(), start);
        }
    }

    response
}
