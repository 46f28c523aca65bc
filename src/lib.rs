//! Multi-tenant SaaS service scaffold.
//!
//! Entity CRUD behind a request pipeline that tags every request with a
//! correlation id, logs it, and answers every failure with one JSON envelope.

pub mod config;
pub mod entities;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod tenancy;

pub use config::AppConfig;
pub use error::{AppError, ErrorEnvelope, ErrorKind};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
