//! Top-level router assembly.

use std::time::Duration;

use axum::{middleware, routing::get, Json, Router};
use serde_json::json;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::admin::admin_routes;
use super::billing::{public_routes, tenant_billing_routes, tenant_routes, webhook_routes};
use super::middleware::{billing_guard, tenant_auth, tenant_status_gate};
use super::state::BillingAppState;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Puts tenant routes behind the full gate chain.
///
/// Requests pass `tenant_auth`, then `tenant_status_gate`, then
/// `billing_guard`, before reaching a handler.
pub fn protect_tenant_routes(
    router: Router<BillingAppState>,
    state: BillingAppState,
) -> Router<BillingAppState> {
    // Layers added last run first.
    router
        .route_layer(middleware::from_fn_with_state(state.clone(), billing_guard))
        .route_layer(middleware::from_fn_with_state(state.clone(), tenant_status_gate))
        .route_layer(middleware::from_fn_with_state(state, tenant_auth))
}

/// Builds the complete API router.
///
/// ```text
/// /health
/// /api/v1/stripe/webhook
/// /api/v1/public/{license/claim,subscribe}
/// /api/v1/billing/{status,portal}
/// /api/v1/tenant/access
/// /api/v1/admin/...
/// ```
pub fn api_router(state: BillingAppState, request_timeout: Duration) -> Router {
    let api = Router::new()
        .nest("/stripe", webhook_routes())
        .nest("/public", public_routes(state.clone()))
        .nest("/billing", tenant_billing_routes(state.clone()))
        .nest("/tenant", tenant_routes(state.clone()))
        .nest("/admin", admin_routes(state.clone()));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
