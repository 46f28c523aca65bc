//! End-to-end behavior of the request pipeline.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::get,
    Router,
};
use serde_json::json;

use saas_scaffold::config::AppConfig;
use saas_scaffold::error::{AppError, ErrorEnvelope, Message};
use saas_scaffold::observability::{LogLevel, LogRecord, CORRELATION_ID_HEADER};

mod common;

use common::{call, json_body, records_for, tenant_request, wrap};

fn is_request_log(r: &LogRecord) -> bool {
    r.event_type() == Some("http_request")
}

/// `http_response` records and the interceptor's failure records both carry latency.
fn is_response_or_error_log(r: &LogRecord) -> bool {
    r.context.get("responseTime").is_some()
}

async fn null_dereference() -> String {
    let price: Option<u32> = None;
    format!("{}", price.unwrap())
}

async fn database_down() -> Result<String, AppError> {
    Err(anyhow::anyhow!("connection refused: postgres://admin:hunter2@db:5432").into())
}

async fn archived() -> Result<String, AppError> {
    Err(AppError::http(StatusCode::FORBIDDEN, "Project is archived"))
}

fn failing_routes() -> Router {
    Router::new()
        .route("/boom", get(null_dereference))
        .route("/db", get(database_down))
        .route("/archived", get(archived))
}

#[tokio::test]
async fn test_inbound_correlation_id_round_trips() {
    let (app, _) = common::test_app();
    let request = tenant_request("GET", "/api/entities/entity-999")
        .header(CORRELATION_ID_HEADER, "req-abc123")
        .body(Body::empty())
        .unwrap();

    let (status, headers, body) = call(&app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers.get(CORRELATION_ID_HEADER).unwrap(), "req-abc123");
    let envelope: ErrorEnvelope = serde_json::from_value(body).unwrap();
    assert_eq!(envelope.correlation_id, "req-abc123");
    assert_eq!(envelope.status_code, 404);
    assert_eq!(envelope.error, "Not Found");
    assert_eq!(envelope.path, "/api/entities/entity-999");
    assert_eq!(envelope.details.unwrap()["resource"], "Entity");
    match envelope.message {
        Message::Single(m) => assert!(m.contains("not found")),
        other => panic!("unexpected message: {:?}", other),
    }
}

#[tokio::test]
async fn test_generated_correlation_id_matches_envelope() {
    let (app, _) = common::test_app();
    let request = tenant_request("GET", "/api/entities/missing")
        .body(Body::empty())
        .unwrap();

    let (_, headers, body) = call(&app, request).await;

    let header_id = headers.get(CORRELATION_ID_HEADER).unwrap().to_str().unwrap();
    assert_eq!(body["correlationId"], header_id);
    let parsed = uuid::Uuid::parse_str(header_id).unwrap();
    assert_eq!(parsed.get_version_num(), 4);
}

#[tokio::test]
async fn test_validation_failure_envelope() {
    let (app, _) = common::test_app();
    let request = tenant_request("POST", "/api/entities")
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(json!({ "name": "" })))
        .unwrap();

    let (status, headers, body) = call(&app, request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
    assert_eq!(body["statusCode"], 422);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["error"], "Unprocessable Entity");
    assert_eq!(body["details"][0]["field"], "name");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_panic_becomes_opaque_500() {
    let (app, sink) = wrap(failing_routes(), &AppConfig::default());
    let request = Request::builder()
        .uri("/boom")
        .header(CORRELATION_ID_HEADER, "req-panic")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = call(&app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["statusCode"], 500);
    assert_eq!(body["message"], "Internal server error");
    assert!(body.get("details").is_none());
    let raw = body.to_string();
    assert!(!raw.contains("unwrap"));
    assert!(!raw.contains("None"));

    let server_side: Vec<_> = records_for(&sink, "req-panic")
        .into_iter()
        .filter(|r| r.level == LogLevel::Error)
        .collect();
    assert!(!server_side.is_empty());
    assert!(server_side
        .iter()
        .any(|r| r.message.contains("called `Option::unwrap()` on a `None` value")));
    assert!(server_side.iter().all(|r| r.context.get_str("stack").is_some()));
}

#[tokio::test]
async fn test_generic_error_not_leaked() {
    let (app, sink) = wrap(failing_routes(), &AppConfig::default());
    let request = Request::builder()
        .uri("/db")
        .header(CORRELATION_ID_HEADER, "req-db")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = call(&app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");
    assert!(!body.to_string().contains("hunter2"));

    let logged = records_for(&sink, "req-db");
    assert!(logged
        .iter()
        .any(|r| r.level == LogLevel::Error && r.message.contains("connection refused")));
}

#[tokio::test]
async fn test_pass_through_exception_preserved() {
    let (app, _) = wrap(failing_routes(), &AppConfig::default());
    let request = Request::builder()
        .uri("/archived")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = call(&app, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["statusCode"], 403);
    assert_eq!(body["message"], "Project is archived");
    assert_eq!(body["error"], "Forbidden");
}

#[tokio::test]
async fn test_one_request_and_one_response_log() {
    let (app, sink) = common::test_app();
    let request = tenant_request("GET", "/api/entities")
        .header(CORRELATION_ID_HEADER, "req-ok")
        .header("x-user-id", "user-7")
        .header(header::USER_AGENT, "pipeline-test")
        .body(Body::empty())
        .unwrap();

    let (status, _, _) = call(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let records = records_for(&sink, "req-ok");
    let requests: Vec<_> = records.iter().filter(|r| is_request_log(r)).collect();
    let responses: Vec<_> = records.iter().filter(|r| is_response_or_error_log(r)).collect();
    assert_eq!(requests.len(), 1);
    assert_eq!(responses.len(), 1);
    assert!(requests[0].timestamp <= responses[0].timestamp);

    let req_pos = records.iter().position(is_request_log).unwrap();
    let res_pos = records.iter().position(is_response_or_error_log).unwrap();
    assert!(req_pos < res_pos);

    let request_log = requests[0];
    assert_eq!(request_log.context.get_str("tenantId"), Some("acme"));
    assert_eq!(request_log.context.get_str("userId"), Some("user-7"));
    assert_eq!(request_log.context.get_str("userAgent"), Some("pipeline-test"));
    assert_eq!(responses[0].event_type(), Some("http_response"));
    assert_eq!(responses[0].context.get("statusCode"), Some(&json!(200)));
}

#[tokio::test]
async fn test_failure_logs_error_instead_of_response() {
    let (app, sink) = wrap(failing_routes(), &AppConfig::default());
    let request = Request::builder()
        .uri("/db")
        .header(CORRELATION_ID_HEADER, "req-fail")
        .body(Body::empty())
        .unwrap();

    call(&app, request).await;

    let records = records_for(&sink, "req-fail");
    assert_eq!(records.iter().filter(|r| is_request_log(r)).count(), 1);
    let outcome: Vec<_> = records.iter().filter(|r| is_response_or_error_log(r)).collect();
    assert_eq!(outcome.len(), 1);
    assert_eq!(outcome[0].level, LogLevel::Error);
    assert_eq!(outcome[0].context.get("statusCode"), Some(&json!(500)));
    assert!(records.iter().all(|r| r.event_type() != Some("http_response")));
}

#[tokio::test]
async fn test_unmatched_route_is_enveloped() {
    let (app, _) = common::test_app();
    let request = Request::builder()
        .uri("/nope")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = call(&app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Cannot GET /nope");
    assert_eq!(body["path"], "/nope");
}

#[tokio::test]
async fn test_missing_tenant_is_denied() {
    let (app, _) = common::test_app();
    let request = Request::builder()
        .uri("/api/entities")
        .header("x-tenant-slug", "Not A Slug")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = call(&app, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Tenant access denied");
    assert_eq!(body["details"]["header"], "x-tenant-slug");
}

#[tokio::test]
async fn test_malformed_json_is_pass_through_400() {
    let (app, _) = common::test_app();
    let request = tenant_request("POST", "/api/entities")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\":"))
        .unwrap();

    let (status, _, body) = call(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["error"], "Bad Request");
}

#[tokio::test]
async fn test_method_not_allowed_is_enveloped() {
    let (app, _) = common::test_app();
    let request = tenant_request("PUT", "/api/entities")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = call(&app, request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["statusCode"], 405);
    assert_eq!(body["message"], "Method Not Allowed");
}

#[tokio::test]
async fn test_slow_handler_times_out() {
    async fn slow() -> &'static str {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "late"
    }

    let mut config = AppConfig::default();
    config.timeouts.request_secs = 1;
    let (app, _) = wrap(Router::new().route("/slow", get(slow)), &config);
    let request = Request::builder()
        .uri("/slow")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = call(&app, request).await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["statusCode"], 408);
}

#[tokio::test]
async fn test_entity_crud_flow() {
    let (app, _) = common::test_app();

    let create = tenant_request("POST", "/api/entities")
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(json!({ "name": "Widget", "description": "first" })))
        .unwrap();
    let (status, _, created) = call(&app, create).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["tenantId"], "acme");

    let duplicate = tenant_request("POST", "/api/entities")
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(json!({ "name": "widget" })))
        .unwrap();
    let (status, _, body) = call(&app, duplicate).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    let update = tenant_request("PATCH", &format!("/api/entities/{}", id))
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(json!({ "name": "Gadget" })))
        .unwrap();
    let (status, _, updated) = call(&app, update).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Gadget");

    let list = tenant_request("GET", "/api/entities").body(Body::empty()).unwrap();
    let (_, _, listed) = call(&app, list).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let other_tenant = Request::builder()
        .uri(format!("/api/entities/{}", id))
        .header("x-tenant-slug", "globex")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = call(&app, other_tenant).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let delete = tenant_request("DELETE", &format!("/api/entities/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = call(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_concurrent_requests_get_distinct_ids() {
    let (app, sink) = common::test_app();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap();
            let (_, headers, _) = call(&app, request).await;
            headers
                .get(CORRELATION_ID_HEADER)
                .unwrap()
                .to_str()
                .unwrap()
                .to_string()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10);

    for id in &ids {
        let records = records_for(&sink, id);
        assert_eq!(records.iter().filter(|r| is_request_log(r)).count(), 1);
        assert_eq!(records.iter().filter(|r| is_response_or_error_log(r)).count(), 1);
    }
}

#[tokio::test]
async fn test_rate_limited_tenant_gets_429_envelope() {
    let mut config = AppConfig::default();
    config.rate_limit.enabled = true;
    config.rate_limit.requests_per_second = 0;
    config.rate_limit.burst_size = 1;
    let (app, _) = wrap(Router::new().route("/ping", get(|| async { "pong" })), &config);

    let first = tenant_request("GET", "/ping").body(Body::empty()).unwrap();
    assert_eq!(status_only(&app, first).await, StatusCode::OK);

    let second = tenant_request("GET", "/ping").body(Body::empty()).unwrap();
    let (status, _, body) = call(&app, second).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["message"], "Too Many Requests");
}

#[tokio::test]
async fn test_rotating_forwarded_for_still_rate_limited() {
    let mut config = AppConfig::default();
    config.rate_limit.enabled = true;
    config.rate_limit.requests_per_second = 0;
    config.rate_limit.burst_size = 1;
    let (app, _) = wrap(Router::new().route("/ping", get(|| async { "pong" })), &config);

    let mut statuses = Vec::new();
    for i in 0..5 {
        let request = Request::builder()
            .uri("/ping")
            .header("x-forwarded-for", format!("10.0.0.{}", i))
            .body(Body::empty())
            .unwrap();
        statuses.push(status_only(&app, request).await);
    }
    assert_eq!(statuses[0], StatusCode::OK);
    assert!(statuses[1..].iter().all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
}

/// For plain-text success bodies that `call` would not decode.
async fn status_only(app: &Router, request: Request<Body>) -> StatusCode {
    use tower::ServiceExt;
    app.clone().oneshot(request).await.unwrap().status()
}
