//! Tenant extraction. Authentication/JWT decoding is an external
//! collaborator out of scope for this core; `pf-server` trusts
//! an upstream auth middleware to have injected the resolved tenant
//! identity into the `X-Tenant-Id` header, and rejects any request
//! missing it with 401 before it reaches the core.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;

use pf_core::TenantId;

pub const TENANT_HEADER: &str = "x-tenant-id";

/// Extracted, authenticated tenant identity for the current request.
pub struct AuthenticatedTenant(pub TenantId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedTenant
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match header {
            Some(value) => Ok(AuthenticatedTenant(TenantId::from(value))),
            None => Err((StatusCode::UNAUTHORIZED, "missing X-Tenant-Id header")),
        }
    }
}

/// 403s a path-scoped tenant id that doesn't match the authenticated
/// tenant, per the billing surface's "resource tenant must match" rule.
pub fn require_matching_tenant(authenticated: &TenantId, path_tenant: &str) -> Result<(), crate::error::ApiError> {
    if authenticated.as_str() == path_tenant {
        Ok(())
    } else {
        Err(crate::error::ApiError::Forbidden)
    }
}
