//! HTTP middleware for the billing API.
//!
//! - `auth` - tenant session and admin identity layers plus extractors
//! - `billing_guard` - tenant status gate and billing guard
//! - `rate_limit` - per-IP throttling of the public endpoints

mod auth;
mod billing_guard;
mod rate_limit;

pub use auth::{admin_auth, tenant_auth, RequireAdmin, RequireTenant, ACCESS_ASSERTION_HEADER};
pub use billing_guard::{
    billing_guard, tenant_status_gate, OptionalTenantStatus, ResolvedTenantStatus,
};
pub use rate_limit::{claim_rate_limit, subscribe_rate_limit};
