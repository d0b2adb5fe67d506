//! Billing domain: tenant lifecycle, entitlements, license keys,
//! subscriptions, webhook reconciliation inputs and the audit trail.

mod access_policy;
mod admin;
mod audit;
mod entitlement;
mod errors;
mod license_key;
mod signature;
mod stripe_event;
mod subscription;
mod tenant;
mod tenant_status;
mod webhook_record;

pub use access_policy::{BillingAccessPolicy, OperationKind};
pub use admin::{
    validate_display_name, validate_email, validate_password, Admin, AdminRole,
    MAX_PASSWORD_LEN, MIN_PASSWORD_LEN,
};
pub use audit::{
    actions, targets, ActorType, BillingAuditLog, BillingAuditLogBuilder,
    RequestOrigin,
};
pub use entitlement::{is_entitled, Entitlement, EntitlementSource};
pub use errors::{BillingError, ErrorKind};
pub use license_key::{
    generate_key_material, is_well_formed, key_digest, normalize_batch_size, normalize_key,
    IssuedLicenseKey, LicenseKey, LicenseKeyStatus, KEY_PREFIX, MAX_GENERATE_BATCH,
};
pub use signature::{sign_header, SignatureVerifier, DEFAULT_TOLERANCE_SECS};
pub use stripe_event::{
    CheckoutSessionObject, InvoiceObject, StripeEvent, StripeEventData, StripeEventType,
    SubscriptionObject,
};
pub use subscription::{
    Subscription, SubscriptionState, STATUS_ACTIVE, STATUS_CANCELED, STATUS_PAST_DUE,
};
pub use tenant::{Tenant, MAX_TENANT_NAME_LEN};
pub use tenant_status::TenantStatus;
pub use webhook_record::{WebhookEventRecord, WebhookResult};

#[cfg(test)]
pub use stripe_event::StripeEventBuilder;
