//! Axum routers for the webhook, public and tenant billing endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::adapters::http::middleware::{claim_rate_limit, subscribe_rate_limit, tenant_auth};
use crate::adapters::http::router::protect_tenant_routes;
use crate::adapters::http::state::BillingAppState;

use super::handlers::{
    claim_license_key, create_portal_session, get_billing_status, get_tenant_access,
    handle_stripe_webhook, subscribe,
};

/// Stripe webhook router, mounted at `/api/v1/stripe`.
///
/// No authentication; the signature is the credential.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/webhook", post(handle_stripe_webhook))
}

/// Unauthenticated routes, mounted at `/api/v1/public`.
///
/// # Routes
/// - `POST /license/claim` - redeem a license key (5/min/IP)
/// - `POST /subscribe` - start a Stripe checkout (5/min/IP)
pub fn public_routes(state: BillingAppState) -> Router<BillingAppState> {
    Router::new()
        .route(
            "/license/claim",
            post(claim_license_key)
                .layer(middleware::from_fn_with_state(state.clone(), claim_rate_limit)),
        )
        .route(
            "/subscribe",
            post(subscribe).layer(middleware::from_fn_with_state(state, subscribe_rate_limit)),
        )
}

/// Tenant billing routes, mounted at `/api/v1/billing`.
///
/// Only tenant authentication applies, so tenants in grace or suspended
/// can still see their status and reach the Stripe portal to pay.
///
/// # Routes
/// - `GET /status` - billing summary
/// - `POST /portal` - Stripe billing portal session
pub fn tenant_billing_routes(state: BillingAppState) -> Router<BillingAppState> {
    Router::new()
        .route("/status", get(get_billing_status))
        .route("/portal", post(create_portal_session))
        .route_layer(middleware::from_fn_with_state(state, tenant_auth))
}

/// Gated tenant routes, mounted at `/api/v1/tenant`.
///
/// # Routes
/// - `GET /access` - what the billing gates decided for the caller
pub fn tenant_routes(state: BillingAppState) -> Router<BillingAppState> {
    protect_tenant_routes(Router::new().route("/access", get(get_tenant_access)), state)
}
