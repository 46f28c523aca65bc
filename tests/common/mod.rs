//! Shared utilities for integration tests.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use saas_scaffold::config::AppConfig;
use saas_scaffold::http::pipeline::{self, PipelineState};
use saas_scaffold::observability::{LogRecord, MemorySink};
use saas_scaffold::HttpServer;

pub const TENANT: &str = "acme";

/// The production router, logging into memory.
pub fn test_app() -> (Router, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let server = HttpServer::new(AppConfig::default(), sink.clone());
    (server.router(), sink)
}

/// Arbitrary routes wrapped in the production pipeline.
#[allow(dead_code)]
pub fn wrap(routes: Router, config: &AppConfig) -> (Router, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let state = PipelineState::new(sink.clone(), config);
    (pipeline::apply(routes, &state, config), sink)
}

/// Request builder carrying the test tenant.
pub fn tenant_request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-tenant-slug", TENANT)
}

#[allow(dead_code)]
pub fn json_body(value: Value) -> Body {
    Body::from(serde_json::to_vec(&value).unwrap())
}

/// Send one request in-process; empty bodies decode as `Null`.
pub async fn call(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

/// Records for one correlation id, in write order.
#[allow(dead_code)]
pub fn records_for(sink: &MemorySink, correlation_id: &str) -> Vec<LogRecord> {
    sink.records()
        .into_iter()
        .filter(|r| r.context.get_str("correlationId") == Some(correlation_id))
        .collect()
}
