//! Per-tenant rate limiting.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::observability::metrics;
use crate::tenancy::TenantContext;

/// A simple token bucket.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Buckets idle this long are dropped on the next sweep.
const IDLE_TTL: Duration = Duration::from_secs(600);

/// Minimum spacing between sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

struct Buckets {
    map: HashMap<String, TokenBucket>,
    last_sweep: Instant,
}

/// Buckets keyed by tenant slug, or socket peer for tenantless requests.
pub struct RateLimiterState {
    buckets: Mutex<Buckets>,
    enabled: bool,
    rps: f64,
    burst: f64,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(Buckets {
                map: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            enabled: config.enabled,
            rps: config.requests_per_second as f64,
            burst: config.burst_size.max(1) as f64,
        }
    }

    pub fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        if now.duration_since(buckets.last_sweep) >= SWEEP_INTERVAL {
            self.evict_idle(&mut buckets.map, now);
            buckets.last_sweep = now;
        }
        let bucket = buckets
            .map
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst));
        bucket.try_acquire(self.burst, self.rps)
    }

    /// Drop buckets that are back at full capacity or have been idle past
    /// [`IDLE_TTL`]. A full bucket behaves exactly like a fresh one.
    fn evict_idle(&self, map: &mut HashMap<String, TokenBucket>, now: Instant) {
        let before = map.len();
        map.retain(|_, bucket| {
            let idle = now.saturating_duration_since(bucket.last_update);
            let refilled = bucket.tokens + idle.as_secs_f64() * self.rps;
            idle < IDLE_TTL && refilled < self.burst
        });
        let evicted = before - map.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = map.len(), "Evicted idle rate limit buckets");
        }
    }
}

/// Tenant slug when resolved, else the socket peer. Forwarding headers are
/// client-controlled and never select a bucket.
fn limit_key(request: &Request) -> String {
    if let Some(tenant) = request.extensions().get::<TenantContext>() {
        return format!("tenant:{}", tenant.slug);
    }
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "anonymous".to_string(),
    }
}

pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.enabled {
        return next.run(request).await;
    }

    let key = limit_key(&request);
    if state.check(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, "Rate limit exceeded");
        metrics::record_rate_limited(key.split(':').next().unwrap_or("anonymous"));
        AppError::rate_limited().into_response()
    }
}
