//! Authentication middleware and extractors for axum.
//!
//! This module provides:
//! - `tenant_auth` - validates the tenant Bearer token and injects `TenantContext`
//! - `admin_auth` - verifies the Cloudflare Access assertion and injects `AdminActor`
//! - `RequireTenant` / `RequireAdmin` - extractors reading what the layers injected
//!
//! # Architecture
//!
//! Both layers go through ports (`TenantSessionValidator`,
//! `AdminIdentityVerifier`), so tests swap in a local JWT codec or the
//! system admin sentinel without touching the routes.
//!
//! ```text
//! Request → tenant_auth → injects TenantContext into extensions
//!                                  ↓
//!                          Handler → RequireTenant extractor reads from extensions
//! ```

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::adapters::http::error::ApiError;
use crate::adapters::http::state::BillingAppState;
use crate::domain::billing::BillingError;
use crate::ports::{AdminActor, AuthError, TenantContext};

/// Header Cloudflare Access forwards with every authenticated request.
pub const ACCESS_ASSERTION_HEADER: &str = "Cf-Access-Jwt-Assertion";

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Tenant authentication middleware.
///
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates it with the `TenantSessionValidator` port
/// 3. On success, injects `TenantContext` into request extensions
/// 4. Otherwise returns 401 (502 when the validator is unavailable)
pub async fn tenant_auth(
    State(state): State<BillingAppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return ApiError::from(AuthError::MissingCredentials).into_response();
    };

    match state.tenant_sessions.validate(&token).await {
        Ok(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Tenant token rejected");
            ApiError::from(e).into_response()
        }
    }
}

/// Admin authentication middleware for `/api/v1/admin`.
///
/// The verifier decides what a missing assertion means: the Cloudflare
/// Access verifier rejects it, the development sentinel accepts it.
pub async fn admin_auth(
    State(state): State<BillingAppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let assertion = request
        .headers()
        .get(ACCESS_ASSERTION_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    match state.admin_identity.verify(assertion.as_deref()).await {
        Ok(actor) => {
            tracing::debug!(actor_id = %actor.id, "Admin identity resolved");
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Admin identity rejected");
            ApiError::from(e).into_response()
        }
    }
}

/// Extractor that requires a tenant session.
///
/// Returns 401 when `tenant_auth` did not run or did not succeed.
#[derive(Debug, Clone, Copy)]
pub struct RequireTenant(pub TenantContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequireTenant
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .copied()
            .map(RequireTenant)
            .ok_or(ApiError(BillingError::Unauthenticated))
    }
}

/// Extractor that requires a resolved platform admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AdminActor);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminActor>()
            .cloned()
            .map(RequireAdmin)
            .ok_or(ApiError(BillingError::Unauthenticated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_requires_prefix() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));
    }
}
