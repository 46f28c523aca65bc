//! Tenant/user resolution middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::config::TenancyConfig;
use crate::tenancy::{TenantContext, UserContext};

pub const DEFAULT_TENANT_HEADER: &str = "x-tenant-slug";
pub const DEFAULT_USER_HEADER: &str = "x-user-id";

const MAX_SLUG_LEN: usize = 63;

/// Header names in effect, attached so extractors can report them.
#[derive(Debug, Clone)]
pub struct IdentityHeaders {
    pub tenant_header: String,
    pub user_header: String,
}

impl From<&TenancyConfig> for IdentityHeaders {
    fn from(config: &TenancyConfig) -> Self {
        Self {
            tenant_header: config.tenant_header.to_ascii_lowercase(),
            user_header: config.user_header.to_ascii_lowercase(),
        }
    }
}

/// Lowercase alphanumerics and `-`, not starting or ending with `-`.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

fn header_str<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub async fn resolve_identity(
    State(headers): State<IdentityHeaders>,
    mut request: Request,
    next: Next,
) -> Response {
    let tenant = header_str(&request, &headers.tenant_header).map(str::to_string);
    let user = header_str(&request, &headers.user_header).map(str::to_string);

    match tenant {
        Some(slug) if is_valid_slug(&slug) => {
            request.extensions_mut().insert(TenantContext { slug });
        }
        Some(slug) => {
            tracing::debug!(tenant = %slug, "Ignoring malformed tenant slug");
        }
        None => {}
    }
    if let Some(user_id) = user {
        request.extensions_mut().insert(UserContext { user_id });
    }
    request.extensions_mut().insert(headers);

    next.run(request).await
}
