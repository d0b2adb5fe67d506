//! Scoped transaction port.
//!
//! Every billing mutation goes through a [`BillingTransaction`] obtained from
//! [`TransactionManager::begin`]. The guard is committed explicitly; dropping
//! it without calling [`BillingTransaction::commit`] rolls back, which covers
//! early `?` returns, panics and cancelled request futures alike.
//!
//! ```ignore
//! let mut tx = self.transactions.begin().await?;
//! tx.update_tenant(&tenant).await?;
//! tx.append_audit_log(&entry).await?;
//! tx.commit().await?;
//! ```
//!
//! Reads issued through the guard observe the transaction's own writes.
//! Callers must not use the non-transactional repository ports while holding
//! a guard.

use async_trait::async_trait;

use crate::domain::billing::{
    Admin, BillingAuditLog, Entitlement, LicenseKey, Subscription, Tenant, WebhookEventRecord,
};
use crate::domain::foundation::{DomainError, LicenseKeyId, TenantId, Timestamp};

use super::SaveResult;

#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn BillingTransaction>, DomainError>;
}

/// Repository operations bound to one open transaction.
#[async_trait]
pub trait BillingTransaction: Send {
    // ─── tenants ───────────────────────────────────────────────────

    /// Reads a tenant and locks its row until the transaction ends.
    async fn find_tenant_for_update(&mut self, id: TenantId) -> Result<Option<Tenant>, DomainError>;

    async fn find_tenant_by_pending_session(
        &mut self,
        session_id: &str,
    ) -> Result<Option<Tenant>, DomainError>;

    async fn insert_tenant(&mut self, tenant: &Tenant) -> Result<(), DomainError>;

    /// Persists status, grace deadline and pending session of the tenant.
    async fn update_tenant(&mut self, tenant: &Tenant) -> Result<(), DomainError>;

    // ─── admins ────────────────────────────────────────────────────

    async fn insert_admin(&mut self, admin: &Admin) -> Result<(), DomainError>;

    // ─── entitlements ──────────────────────────────────────────────

    async fn list_entitlements(&mut self, tenant_id: TenantId)
        -> Result<Vec<Entitlement>, DomainError>;

    async fn insert_entitlement(&mut self, entitlement: &Entitlement) -> Result<(), DomainError>;

    /// Persists `revoked_at`.
    async fn update_entitlement(&mut self, entitlement: &Entitlement) -> Result<(), DomainError>;

    // ─── license keys ──────────────────────────────────────────────

    async fn find_license_key_for_update(
        &mut self,
        id: LicenseKeyId,
    ) -> Result<Option<LicenseKey>, DomainError>;

    async fn insert_license_key(&mut self, key: &LicenseKey) -> Result<(), DomainError>;

    /// Conditionally marks a key claimed.
    ///
    /// Succeeds only while the key is still unclaimed and unexpired at `now`;
    /// returns `false` when another claim won the race.
    async fn claim_license_key(
        &mut self,
        id: LicenseKeyId,
        tenant_id: TenantId,
        now: Timestamp,
    ) -> Result<bool, DomainError>;

    /// Persists status and timestamps of the key.
    async fn update_license_key(&mut self, key: &LicenseKey) -> Result<(), DomainError>;

    // ─── subscriptions ─────────────────────────────────────────────

    async fn find_subscription_by_stripe_id(
        &mut self,
        stripe_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Inserts or updates, keyed by the Stripe subscription id.
    async fn upsert_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError>;

    // ─── ledger & audit ────────────────────────────────────────────

    /// Records a webhook event id. A duplicate id is reported, not raised.
    async fn insert_webhook_event(
        &mut self,
        record: &WebhookEventRecord,
    ) -> Result<SaveResult, DomainError>;

    async fn append_audit_log(&mut self, entry: &BillingAuditLog) -> Result<(), DomainError>;

    // ─── completion ────────────────────────────────────────────────

    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}
