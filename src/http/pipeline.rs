//! Cross-cutting request pipeline.
//!
//! # Layer Order (outermost first)
//! ```text
//! propagate_correlation_id   attach / echo x-correlation-id
//! normalize_errors           failures → ErrorEnvelope
//! resolve_identity           tenant / user extensions
//! observe_requests           request + response/error records
//! rate_limit_middleware      429 per tenant / client
//! TimeoutLayer               408 on slow handlers
//! RequestBodyLimitLayer      413 on oversized bodies
//! CatchPanicLayer            panic → AppError::Internal
//! handlers
//! ```

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

use crate::config::AppConfig;
use crate::error::{normalize_errors, AppError, ErrorNormalizer};
use crate::observability::correlation::propagate_correlation_id;
use crate::observability::interceptor::observe_requests;
use crate::observability::{LogSink, StructuredLogger};
use crate::security::rate_limit::{rate_limit_middleware, RateLimiterState};
use crate::tenancy::{resolve_identity, IdentityHeaders};

/// Shared pieces every pipeline layer needs.
#[derive(Clone)]
pub struct PipelineState {
    pub logger: StructuredLogger,
    pub normalizer: ErrorNormalizer,
    pub identity: IdentityHeaders,
    pub rate_limiter: Arc<RateLimiterState>,
}

impl PipelineState {
    pub fn new(sink: Arc<dyn LogSink>, config: &AppConfig) -> Self {
        let logger = StructuredLogger::new(sink);
        Self {
            normalizer: ErrorNormalizer::new(logger.clone()),
            identity: IdentityHeaders::from(&config.tenancy),
            rate_limiter: Arc::new(RateLimiterState::new(&config.rate_limit)),
            logger,
        }
    }
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    AppError::Internal(anyhow::anyhow!("handler panicked: {}", detail)).into_response()
}

/// Wrap `router` (routes and fallback) in the full pipeline.
#[allow(deprecated)]
pub fn apply(router: Router, state: &PipelineState, config: &AppConfig) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(from_fn_with_state(state.rate_limiter.clone(), rate_limit_middleware))
        .layer(from_fn_with_state(state.logger.clone(), observe_requests))
        .layer(from_fn_with_state(state.identity.clone(), resolve_identity))
        .layer(from_fn_with_state(state.normalizer.clone(), normalize_errors))
        .layer(from_fn(propagate_correlation_id))
}
