//! In-memory billing store for tests and local development.
//!
//! Implements every billing repository port plus the transaction manager.
//! Transactions are serialisable: `begin` takes an owned lock on the whole
//! state and stages writes on a working copy, which `commit` swaps in.
//! Dropping an uncommitted transaction discards the copy.
//!
//! Non-transactional reads also take the lock, so they wait for any open
//! transaction to finish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::billing::{
    Admin, BillingAuditLog, Entitlement, LicenseKey, Subscription, Tenant, WebhookEventRecord,
};
use crate::domain::foundation::{
    AdminId, DomainError, ErrorCode, LicenseKeyId, TenantId, Timestamp,
};
use crate::ports::{
    AdminRepository, AuditLogQuery, BillingAuditLogRepository, BillingTransaction,
    EntitlementRepository, LicenseKeyFilter, LicenseKeyRepository, Page, SaveResult,
    SubscriptionRepository, TenantFilter, TenantRepository, TransactionManager,
    WebhookEventRepository,
};

#[derive(Debug, Clone, Default)]
struct BillingState {
    tenants: HashMap<TenantId, Tenant>,
    admins: HashMap<AdminId, Admin>,
    entitlements: Vec<Entitlement>,
    license_keys: HashMap<LicenseKeyId, LicenseKey>,
    /// Keyed by Stripe subscription id.
    subscriptions: HashMap<String, Subscription>,
    webhook_events: HashMap<String, WebhookEventRecord>,
    audit_logs: Vec<BillingAuditLog>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_audit_appends: AtomicBool,
}

/// Shared, cloneable in-memory store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingStore {
    state: Arc<Mutex<BillingState>>,
    faults: Arc<Faults>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent audit append fail, to exercise rollback.
    pub fn fail_audit_appends(&self, fail: bool) {
        self.faults.fail_audit_appends.store(fail, Ordering::SeqCst);
    }

    // ─── seeding ───────────────────────────────────────────────────

    pub async fn seed_tenant(&self, tenant: Tenant) {
        self.state.lock().await.tenants.insert(tenant.id(), tenant);
    }

    pub async fn seed_admin(&self, admin: Admin) {
        self.state.lock().await.admins.insert(admin.id, admin);
    }

    pub async fn seed_entitlement(&self, entitlement: Entitlement) {
        self.state.lock().await.entitlements.push(entitlement);
    }

    pub async fn seed_license_key(&self, key: LicenseKey) {
        self.state.lock().await.license_keys.insert(key.id, key);
    }

    pub async fn seed_subscription(&self, subscription: Subscription) {
        self.state
            .lock()
            .await
            .subscriptions
            .insert(subscription.stripe_subscription_id.clone(), subscription);
    }

    // ─── inspection ────────────────────────────────────────────────

    pub async fn all_tenants(&self) -> Vec<Tenant> {
        self.state.lock().await.tenants.values().cloned().collect()
    }

    pub async fn all_admins(&self) -> Vec<Admin> {
        self.state.lock().await.admins.values().cloned().collect()
    }

    pub async fn all_entitlements(&self) -> Vec<Entitlement> {
        self.state.lock().await.entitlements.clone()
    }

    pub async fn all_subscriptions(&self) -> Vec<Subscription> {
        self.state.lock().await.subscriptions.values().cloned().collect()
    }

    pub async fn all_webhook_events(&self) -> Vec<WebhookEventRecord> {
        self.state.lock().await.webhook_events.values().cloned().collect()
    }

    /// Audit entries in insertion order.
    pub async fn all_audit_logs(&self) -> Vec<BillingAuditLog> {
        self.state.lock().await.audit_logs.clone()
    }
}

fn already_exists(what: &str) -> DomainError {
    DomainError::new(ErrorCode::AlreadyExists, format!("{} already exists", what))
}

fn missing(what: &str) -> DomainError {
    DomainError::not_found(format!("{} not found", what))
}

// ════════════════════════════════════════════════════════════════════
// Read-only repositories
// ════════════════════════════════════════════════════════════════════

#[async_trait]
impl TenantRepository for InMemoryBillingStore {
    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, DomainError> {
        Ok(self.state.lock().await.tenants.get(&id).cloned())
    }

    async fn list(&self, filter: &TenantFilter) -> Result<Page<Tenant>, DomainError> {
        let state = self.state.lock().await;
        let mut tenants: Vec<Tenant> = state
            .tenants
            .values()
            .filter(|t| filter.status.map_or(true, |s| t.status() == s))
            .cloned()
            .collect();
        tenants.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(a.id().cmp(&b.id())));
        Ok(Page::from_filtered(tenants, filter.page))
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryBillingStore {
    async fn list_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Entitlement>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .entitlements
            .iter()
            .filter(|e| e.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn has_revoked(&self, tenant_id: TenantId) -> Result<bool, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .entitlements
            .iter()
            .any(|e| e.tenant_id == tenant_id && e.is_revoked()))
    }
}

#[async_trait]
impl LicenseKeyRepository for InMemoryBillingStore {
    async fn find_by_id(&self, id: LicenseKeyId) -> Result<Option<LicenseKey>, DomainError> {
        Ok(self.state.lock().await.license_keys.get(&id).cloned())
    }

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<LicenseKey>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .license_keys
            .values()
            .find(|k| k.key_hash == key_hash)
            .cloned())
    }

    async fn list(&self, filter: &LicenseKeyFilter) -> Result<Page<LicenseKey>, DomainError> {
        let now = Timestamp::now();
        let state = self.state.lock().await;
        let mut keys: Vec<LicenseKey> = state
            .license_keys
            .values()
            .filter(|k| filter.status.map_or(true, |s| k.effective_status(now) == s))
            .cloned()
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_filtered(keys, filter.page))
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryBillingStore {
    async fn find_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<Subscription>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .subscriptions
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .max_by_key(|s| s.updated_at)
            .cloned())
    }

    async fn find_by_stripe_subscription_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .state
            .lock()
            .await
            .subscriptions
            .get(stripe_subscription_id)
            .cloned())
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryBillingStore {
    async fn find_by_event_id(
        &self,
        external_event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self
            .state
            .lock()
            .await
            .webhook_events
            .get(external_event_id)
            .cloned())
    }
}

#[async_trait]
impl BillingAuditLogRepository for InMemoryBillingStore {
    async fn list(&self, query: &AuditLogQuery) -> Result<Page<BillingAuditLog>, DomainError> {
        let state = self.state.lock().await;
        let entries: Vec<BillingAuditLog> = state
            .audit_logs
            .iter()
            .rev()
            .filter(|e| query.action.as_deref().map_or(true, |a| e.action == a))
            .cloned()
            .collect();
        Ok(Page::from_filtered(entries, query.page))
    }
}

#[async_trait]
impl AdminRepository for InMemoryBillingStore {
    async fn find_by_id(&self, id: AdminId) -> Result<Option<Admin>, DomainError> {
        Ok(self.state.lock().await.admins.get(&id).cloned())
    }

    async fn list_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Admin>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .admins
            .values()
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}

// ════════════════════════════════════════════════════════════════════
// Transactions
// ════════════════════════════════════════════════════════════════════

#[async_trait]
impl TransactionManager for InMemoryBillingStore {
    async fn begin(&self) -> Result<Box<dyn BillingTransaction>, DomainError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            faults: Arc::clone(&self.faults),
        }))
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<BillingState>,
    working: BillingState,
    faults: Arc<Faults>,
}

#[async_trait]
impl BillingTransaction for InMemoryTransaction {
    async fn find_tenant_for_update(
        &mut self,
        id: TenantId,
    ) -> Result<Option<Tenant>, DomainError> {
        Ok(self.working.tenants.get(&id).cloned())
    }

    async fn find_tenant_by_pending_session(
        &mut self,
        session_id: &str,
    ) -> Result<Option<Tenant>, DomainError> {
        Ok(self
            .working
            .tenants
            .values()
            .find(|t| t.pending_stripe_session_id() == Some(session_id))
            .cloned())
    }

    async fn insert_tenant(&mut self, tenant: &Tenant) -> Result<(), DomainError> {
        if self.working.tenants.contains_key(&tenant.id()) {
            return Err(already_exists("tenant"));
        }
        self.working.tenants.insert(tenant.id(), tenant.clone());
        Ok(())
    }

    async fn update_tenant(&mut self, tenant: &Tenant) -> Result<(), DomainError> {
        match self.working.tenants.get_mut(&tenant.id()) {
            Some(existing) => {
                *existing = tenant.clone();
                Ok(())
            }
            None => Err(missing("tenant")),
        }
    }

    async fn insert_admin(&mut self, admin: &Admin) -> Result<(), DomainError> {
        if self.working.admins.contains_key(&admin.id) {
            return Err(already_exists("admin"));
        }
        self.working.admins.insert(admin.id, admin.clone());
        Ok(())
    }

    async fn list_entitlements(
        &mut self,
        tenant_id: TenantId,
    ) -> Result<Vec<Entitlement>, DomainError> {
        Ok(self
            .working
            .entitlements
            .iter()
            .filter(|e| e.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn insert_entitlement(&mut self, entitlement: &Entitlement) -> Result<(), DomainError> {
        if self.working.entitlements.iter().any(|e| e.id == entitlement.id) {
            return Err(already_exists("entitlement"));
        }
        self.working.entitlements.push(entitlement.clone());
        Ok(())
    }

    async fn update_entitlement(&mut self, entitlement: &Entitlement) -> Result<(), DomainError> {
        match self
            .working
            .entitlements
            .iter_mut()
            .find(|e| e.id == entitlement.id)
        {
            Some(existing) => {
                existing.revoked_at = entitlement.revoked_at;
                Ok(())
            }
            None => Err(missing("entitlement")),
        }
    }

    async fn find_license_key_for_update(
        &mut self,
        id: LicenseKeyId,
    ) -> Result<Option<LicenseKey>, DomainError> {
        Ok(self.working.license_keys.get(&id).cloned())
    }

    async fn insert_license_key(&mut self, key: &LicenseKey) -> Result<(), DomainError> {
        let duplicate = self.working.license_keys.contains_key(&key.id)
            || self
                .working
                .license_keys
                .values()
                .any(|k| k.key_hash == key.key_hash);
        if duplicate {
            return Err(already_exists("license key"));
        }
        self.working.license_keys.insert(key.id, key.clone());
        Ok(())
    }

    async fn claim_license_key(
        &mut self,
        id: LicenseKeyId,
        tenant_id: TenantId,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        match self.working.license_keys.get_mut(&id) {
            Some(key) => Ok(key.claim(tenant_id, now).is_ok()),
            None => Ok(false),
        }
    }

    async fn update_license_key(&mut self, key: &LicenseKey) -> Result<(), DomainError> {
        match self.working.license_keys.get_mut(&key.id) {
            Some(existing) => {
                *existing = key.clone();
                Ok(())
            }
            None => Err(missing("license key")),
        }
    }

    async fn find_subscription_by_stripe_id(
        &mut self,
        stripe_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .working
            .subscriptions
            .get(stripe_subscription_id)
            .cloned())
    }

    async fn upsert_subscription(
        &mut self,
        subscription: &Subscription,
    ) -> Result<(), DomainError> {
        let entry = self
            .working
            .subscriptions
            .entry(subscription.stripe_subscription_id.clone())
            .or_insert_with(|| subscription.clone());
        entry.status = subscription.status.clone();
        entry.current_period_end = subscription.current_period_end;
        entry.stripe_customer_id = subscription.stripe_customer_id.clone();
        entry.updated_at = subscription.updated_at;
        Ok(())
    }

    async fn insert_webhook_event(
        &mut self,
        record: &WebhookEventRecord,
    ) -> Result<SaveResult, DomainError> {
        if self
            .working
            .webhook_events
            .contains_key(&record.external_event_id)
        {
            return Ok(SaveResult::AlreadyExists);
        }
        self.working
            .webhook_events
            .insert(record.external_event_id.clone(), record.clone());
        Ok(SaveResult::Inserted)
    }

    async fn append_audit_log(&mut self, entry: &BillingAuditLog) -> Result<(), DomainError> {
        if self.faults.fail_audit_appends.load(Ordering::SeqCst) {
            return Err(DomainError::database("audit log write failed (injected)"));
        }
        self.working.audit_logs.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let InMemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
