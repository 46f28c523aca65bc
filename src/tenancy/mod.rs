//! Tenant and user context.
//!
//! # Data Flow
//! ```text
//! x-tenant-slug / x-user-id headers
//!     → resolver.rs (validate, attach extensions)
//!     → interceptor reads them for log context
//!     → handlers demand a tenant through the `Tenant` extractor
//! ```
//!
//! # Design Decisions
//! - Resolution only attaches what it can read; rejection happens where a
//!   handler actually requires a tenant
//! - No authorization policy lives here

pub mod resolver;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde_json::json;

use crate::error::AppError;

pub use resolver::{is_valid_slug, resolve_identity, IdentityHeaders};

/// Tenant attached to the request by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub slug: String,
}

/// Caller identity as supplied by the upstream auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: String,
}

/// Extractor requiring a resolved tenant.
#[derive(Debug, Clone)]
pub struct Tenant(pub TenantContext);

impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<TenantContext>() {
            Some(ctx) => Ok(Tenant(ctx.clone())),
            None => {
                let header = parts
                    .extensions
                    .get::<IdentityHeaders>()
                    .map(|h| h.tenant_header.clone())
                    .unwrap_or_else(|| resolver::DEFAULT_TENANT_HEADER.to_string());
                Err(AppError::tenant_denied(json!({
                    "reason": "missing or invalid tenant",
                    "header": header,
                })))
            }
        }
    }
}
