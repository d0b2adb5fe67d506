//! Axum router for the platform admin billing API.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::adapters::http::middleware::admin_auth;
use crate::adapters::http::state::BillingAppState;

use super::handlers::{
    generate_license_keys, get_tenant, grant_entitlement, list_audit_logs, list_license_keys,
    list_tenants, revoke_entitlement, revoke_license_key, update_tenant_status,
};

/// Create the admin API router, mounted at `/api/v1/admin`.
///
/// # Routes
///
/// ## License keys
/// - `GET /license-keys` - list (status filter, paginated)
/// - `POST /license-keys` - generate a batch
/// - `POST /license-keys/:id/revoke` - revoke
///
/// ## Tenants
/// - `GET /tenants` - list (status filter, paginated)
/// - `GET /tenants/:id` - detail with entitlements, subscription and admins
/// - `PUT /tenants/:id/status` - status change, including reinstatement
/// - `POST /tenants/:id/entitlements` - grant an entitlement
/// - `POST /tenants/:id/entitlements/:entitlement_id/revoke` - revoke it
///
/// ## Audit
/// - `GET /audit-logs` - list (action filter, paginated)
pub fn admin_routes(state: BillingAppState) -> Router<BillingAppState> {
    Router::new()
        .route(
            "/license-keys",
            get(list_license_keys).post(generate_license_keys),
        )
        .route("/license-keys/:id/revoke", post(revoke_license_key))
        .route("/tenants", get(list_tenants))
        .route("/tenants/:id", get(get_tenant))
        .route("/tenants/:id/status", put(update_tenant_status))
        .route("/tenants/:id/entitlements", post(grant_entitlement))
        .route(
            "/tenants/:id/entitlements/:entitlement_id/revoke",
            post(revoke_entitlement),
        )
        .route("/audit-logs", get(list_audit_logs))
        .route_layer(middleware::from_fn_with_state(state, admin_auth))
}
