//! Correlation ID resolution and propagation.
//!
//! # Responsibilities
//! - Reuse an inbound `x-correlation-id` verbatim
//! - Otherwise generate a UUID v4
//! - Store the id on the request so every later layer reads the same value
//! - Echo the id on the response
//!
//! # Design Decisions
//! - The id lives in request extensions; it is never held in process-wide state
//! - Resolution is idempotent: a second `ensure` returns the stored id
//! - Generation cannot fail; without OS randomness a timestamp-based token is used

use std::convert::Infallible;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, Extensions, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;

/// Header carrying the correlation id in both directions.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Opaque per-request token tying logs and error responses together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        match OsRng.try_fill_bytes(&mut bytes) {
            Ok(()) => Self(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "OS randomness unavailable, using fallback correlation id");
                Self::fallback()
            }
        }
    }

    fn fallback() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(format!("{:x}-{:016x}", millis, fastrand::u64(..)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_header(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .map(|v| Self(v.to_string()))
    }

    /// Id already attached to a request, if any.
    pub fn from_extensions(extensions: &Extensions) -> Option<Self> {
        extensions.get::<CorrelationId>().cloned()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn resolve(headers: &HeaderMap, extensions: &Extensions) -> (CorrelationId, bool) {
    match CorrelationId::from_extensions(extensions) {
        Some(existing) => (existing, false),
        None => (
            CorrelationId::from_header(headers).unwrap_or_else(CorrelationId::generate),
            true,
        ),
    }
}

fn write_header(headers: &mut HeaderMap, id: &CorrelationId) {
    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        headers.insert(CORRELATION_ID_HEADER, value);
    }
}

/// Resolve the request's correlation id, attaching it if not yet present.
pub fn ensure<B>(request: &mut axum::http::Request<B>) -> CorrelationId {
    let (id, fresh) = resolve(request.headers(), request.extensions());
    if fresh {
        write_header(request.headers_mut(), &id);
        request.extensions_mut().insert(id.clone());
    }
    id
}

/// Same as [`ensure`], for extractors working on request parts.
pub fn ensure_parts(parts: &mut Parts) -> CorrelationId {
    let (id, fresh) = resolve(&parts.headers, &parts.extensions);
    if fresh {
        write_header(&mut parts.headers, &id);
        parts.extensions.insert(id.clone());
    }
    id
}

/// Outermost middleware: attach the id and echo it on the response.
pub async fn propagate_correlation_id(mut request: Request, next: Next) -> Response {
    let id = ensure(&mut request);
    let mut response = next.run(request).await;
    if !response.headers().contains_key(CORRELATION_ID_HEADER) {
        write_header(response.headers_mut(), &id);
    }
    response
}

impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ensure_parts(parts))
    }
}
