//! HTTP handlers for the Stripe webhook, the public endpoints and the
//! tenant-facing billing endpoints.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use secrecy::ExposeSecret;

use crate::adapters::http::error::{ApiError, PublicApiError};
use crate::adapters::http::middleware::{OptionalTenantStatus, RequireTenant};
use crate::adapters::http::origin::ClientOrigin;
use crate::adapters::http::state::BillingAppState;
use crate::application::handlers::billing::{
    ClaimLicenseKeyCommand, HandleStripeWebhookCommand, SubscribeCommand,
};
use crate::domain::billing::{BillingError, StripeEvent};

use super::dto::{
    ClaimLicenseKeyRequest, ClaimLicenseKeyResponse, PortalSessionResponse, SubscribeRequest,
    SubscribeResponse, TenantAccessResponse, WebhookAck,
};

/// Header carrying the Stripe webhook signature.
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Stripe webhook
// ════════════════════════════════════════════════════════════════════════════════

/// `POST /api/v1/stripe/webhook`
///
/// The signature is checked against the raw body before any parsing.
/// Processing failures answer 500 so Stripe retries; the ledger makes the
/// retry safe.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let Some(secret) = state.settings.webhook_secret.as_ref() else {
        tracing::info!("Stripe webhook received while integration is disabled");
        return Ok(Json(WebhookAck::IGNORED));
    };

    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            tracing::warn!("Stripe webhook without signature header");
            BillingError::MissingSignature
        })?;

    if !state
        .settings
        .signature_verifier
        .verify(&body, signature, secret.expose_secret())
    {
        tracing::warn!(body_len = body.len(), "Stripe webhook signature rejected");
        return Err(BillingError::InvalidSignature.into());
    }

    let event = StripeEvent::parse(&body).map_err(|err| {
        tracing::warn!(error = %err, "Stripe webhook payload rejected");
        err
    })?;
    let event_id = event.id.clone();
    let event_type = event.event_type.clone();

    let processed = state
        .stripe_webhook_handler()
        .handle(HandleStripeWebhookCommand {
            event,
            raw_body: body.to_vec(),
        })
        .await
        .map_err(|err| {
            if err.is_retryable() {
                tracing::error!(
                    event_id = %event_id,
                    event_type = %event_type,
                    error = %err,
                    "Stripe webhook processing failed"
                );
                ApiError(BillingError::infrastructure(format!(
                    "webhook {} failed: {}",
                    event_id, err
                )))
            } else {
                tracing::warn!(
                    event_id = %event_id,
                    error = %err,
                    "Stripe webhook not processable"
                );
                ApiError(err)
            }
        })?;

    tracing::debug!(event_id = %event_id, processed, "Stripe webhook acknowledged");
    Ok(Json(WebhookAck::OK))
}

// ════════════════════════════════════════════════════════════════════════════════
// Public endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// `POST /api/v1/public/license/claim`
///
/// Answers 201 with the new tenant or a generic 400. The claim handler waits
/// the failure delay on every call; malformed bodies wait here instead.
pub async fn claim_license_key(
    State(state): State<BillingAppState>,
    ClientOrigin(origin): ClientOrigin,
    payload: Result<Json<ClaimLicenseKeyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, PublicApiError> {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tokio::time::sleep(state.settings.failure_delay).await;
            return Err(rejection.into());
        }
    };

    let result = state
        .claim_license_key_handler()
        .handle(ClaimLicenseKeyCommand {
            license_key: req.license_key,
            email: req.email,
            password: req.password,
            display_name: req.display_name,
            tenant_name: req.tenant_name,
            origin,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ClaimLicenseKeyResponse::from(result))))
}

/// `POST /api/v1/public/subscribe`
pub async fn subscribe(
    State(state): State<BillingAppState>,
    ClientOrigin(origin): ClientOrigin,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, PublicApiError> {
    let Json(req) = payload?;

    let result = state
        .subscribe_handler()
        .handle(SubscribeCommand {
            email: req.email,
            password: req.password,
            display_name: req.display_name,
            tenant_name: req.tenant_name,
            origin,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(SubscribeResponse::from(result))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Tenant endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// `GET /api/v1/billing/status`
pub async fn get_billing_status(
    State(state): State<BillingAppState>,
    RequireTenant(tenant): RequireTenant,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .billing_status_handler()
        .handle(tenant.tenant_id)
        .await?;
    Ok(Json(view))
}

/// `POST /api/v1/billing/portal`
pub async fn create_portal_session(
    State(state): State<BillingAppState>,
    RequireTenant(tenant): RequireTenant,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .portal_session_handler()
        .handle(tenant.tenant_id)
        .await?;

    tracing::info!(tenant_id = %tenant.tenant_id, "Billing portal session created");
    Ok(Json(PortalSessionResponse::from(session)))
}

/// `GET /api/v1/tenant/access`
///
/// Only reachable once the tenant gates admitted the request.
pub async fn get_tenant_access(
    RequireTenant(tenant): RequireTenant,
    OptionalTenantStatus(status): OptionalTenantStatus,
) -> impl IntoResponse {
    Json(TenantAccessResponse::new(tenant.tenant_id, status))
}
