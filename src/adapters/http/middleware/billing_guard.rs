//! Billing gates for tenant routes.
//!
//! Chained after `tenant_auth`, in this order:
//!
//! 1. `tenant_status_gate` rejects every request of a suspended tenant.
//! 2. `billing_guard` rejects everything for a tenant with a revoked
//!    entitlement and writes for a tenant that is not active. On success it
//!    stores the resolved status as `ResolvedTenantStatus`.
//!
//! Requests without a `TenantContext` pass both gates untouched.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::adapters::http::error::ApiError;
use crate::adapters::http::state::BillingAppState;
use crate::domain::billing::{BillingError, OperationKind, TenantStatus};
use crate::ports::TenantContext;

/// Tenant status resolved by the billing guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTenantStatus(pub TenantStatus);

pub async fn tenant_status_gate(
    State(state): State<BillingAppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(context) = request.extensions().get::<TenantContext>().copied() else {
        return next.run(request).await;
    };

    match state.tenant_status_gate().handle(context.tenant_id).await {
        Ok(()) => next.run(request).await,
        Err(err) => {
            log_rejection(&context, &err);
            ApiError(err).into_response()
        }
    }
}

pub async fn billing_guard(
    State(state): State<BillingAppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = request.extensions().get::<TenantContext>().copied();
    let operation = OperationKind::from_method(request.method().as_str());

    match state
        .billing_guard()
        .handle(context.map(|c| c.tenant_id), operation)
        .await
    {
        Ok(Some(status)) => {
            request.extensions_mut().insert(ResolvedTenantStatus(status));
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(err) => {
            if let Some(context) = &context {
                log_rejection(context, &err);
            }
            ApiError(err).into_response()
        }
    }
}

fn log_rejection(context: &TenantContext, err: &BillingError) {
    match err {
        BillingError::Infrastructure(_) => {}
        _ => tracing::warn!(
            tenant_id = %context.tenant_id,
            code = err.code(),
            "Tenant request blocked by billing gate"
        ),
    }
}

/// Reads the status stored by `billing_guard`, if it ran.
#[derive(Debug, Clone, Copy)]
pub struct OptionalTenantStatus(pub Option<TenantStatus>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for OptionalTenantStatus
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalTenantStatus(
            parts
                .extensions
                .get::<ResolvedTenantStatus>()
                .map(|resolved| resolved.0),
        ))
    }
}
