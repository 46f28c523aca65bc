//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (tenant already resolved):
//!     → rate_limit.rs (per-tenant / per-IP token bucket)
//!     → Pass to handlers, or answer 429 through the error pipeline
//! ```
//!
//! # Design Decisions
//! - Rejections are `AppError`s so they get the same envelope as everything else
//! - Body size and timeouts are tower-http layers configured in http/pipeline.rs

pub mod rate_limit;
