//! Billing command and query handlers.
//!
//! Every mutating handler opens one [`BillingTransaction`](crate::ports::BillingTransaction),
//! applies its changes together with an audit entry and commits. Handlers
//! that read before opening a transaction use the repository ports.

mod admin_tenants;
mod check_billing_access;
mod claim_license_key;
mod create_portal_session;
mod generate_license_keys;
mod get_billing_status;
mod handle_stripe_webhook;
mod list_audit_logs;
mod list_license_keys;
mod manage_entitlements;
mod revoke_license_key;
mod subscribe;

#[cfg(test)]
pub(crate) mod test_support;

pub use admin_tenants::{
    GetTenantDetailHandler, ListTenantsHandler, TenantDetail, UpdateTenantStatusCommand,
    UpdateTenantStatusHandler,
};
pub use check_billing_access::{CheckBillingAccessHandler, CheckTenantStatusHandler};
pub use claim_license_key::{ClaimLicenseKeyCommand, ClaimLicenseKeyHandler, ClaimLicenseKeyResult};
pub use create_portal_session::CreatePortalSessionHandler;
pub use generate_license_keys::{GenerateLicenseKeysCommand, GenerateLicenseKeysHandler};
pub use get_billing_status::{BillingStatusView, GetBillingStatusHandler};
pub use handle_stripe_webhook::{
    HandleStripeWebhookCommand, HandleStripeWebhookHandler, ReconciliationSettings,
};
pub use list_audit_logs::ListAuditLogsHandler;
pub use list_license_keys::ListLicenseKeysHandler;
pub use manage_entitlements::{
    GrantEntitlementCommand, GrantEntitlementHandler, RevokeEntitlementCommand,
    RevokeEntitlementHandler,
};
pub use revoke_license_key::{RevokeLicenseKeyCommand, RevokeLicenseKeyHandler};
pub use subscribe::{CheckoutSettings, SubscribeCommand, SubscribeHandler, SubscribeResult};

use serde_json::json;

use crate::domain::billing::{LicenseKey, Tenant};

/// Audit snapshot of the tenant fields billing mutates.
pub(crate) fn tenant_snapshot(tenant: &Tenant) -> serde_json::Value {
    json!({
        "status": tenant.status().as_str(),
        "grace_until": tenant.grace_until(),
    })
}

pub(crate) fn license_key_snapshot(key: &LicenseKey) -> serde_json::Value {
    json!({
        "status": key.status.as_str(),
        "claimed_by": key.claimed_by.map(|t| t.to_string()),
    })
}
