//! Admin tenant operations: list, detail and status changes.
//!
//! Status changes go through the tenant state machine. Moving a suspended
//! tenant back to active is the admin reinstatement path; nothing else in
//! the system leaves `suspended`.

use std::sync::Arc;

use crate::domain::billing::{
    actions, targets, ActorType, Admin, BillingAuditLog, BillingError, Entitlement, RequestOrigin,
    Subscription, Tenant, TenantStatus,
};
use crate::domain::foundation::{TenantId, Timestamp};
use crate::ports::{
    AdminActor, AdminRepository, EntitlementRepository, Page, SubscriptionRepository,
    TenantFilter, TenantRepository, TransactionManager,
};

use super::tenant_snapshot;

// ─── list ──────────────────────────────────────────────────────────

pub struct ListTenantsHandler {
    tenants: Arc<dyn TenantRepository>,
}

impl ListTenantsHandler {
    pub fn new(tenants: Arc<dyn TenantRepository>) -> Self {
        Self { tenants }
    }

    pub async fn handle(&self, filter: TenantFilter) -> Result<Page<Tenant>, BillingError> {
        Ok(self.tenants.list(&filter).await?)
    }
}

// ─── detail ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TenantDetail {
    pub tenant: Tenant,
    pub entitlements: Vec<Entitlement>,
    pub subscription: Option<Subscription>,
    pub admins: Vec<Admin>,
}

pub struct GetTenantDetailHandler {
    tenants: Arc<dyn TenantRepository>,
    entitlements: Arc<dyn EntitlementRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    admins: Arc<dyn AdminRepository>,
}

impl GetTenantDetailHandler {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        entitlements: Arc<dyn EntitlementRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        admins: Arc<dyn AdminRepository>,
    ) -> Self {
        Self {
            tenants,
            entitlements,
            subscriptions,
            admins,
        }
    }

    pub async fn handle(&self, tenant_id: TenantId) -> Result<TenantDetail, BillingError> {
        let tenant = self
            .tenants
            .find_by_id(tenant_id)
            .await?
            .ok_or(BillingError::TenantNotFound)?;

        Ok(TenantDetail {
            entitlements: self.entitlements.list_for_tenant(tenant_id).await?,
            subscription: self.subscriptions.find_by_tenant(tenant_id).await?,
            admins: self.admins.list_for_tenant(tenant_id).await?,
            tenant,
        })
    }
}

// ─── status update ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct UpdateTenantStatusCommand {
    pub tenant_id: TenantId,
    pub status: TenantStatus,
    /// Only used when moving into grace; defaults to the configured period.
    pub grace_until: Option<Timestamp>,
    pub actor: AdminActor,
    pub origin: RequestOrigin,
}

pub struct UpdateTenantStatusHandler {
    transactions: Arc<dyn TransactionManager>,
    grace_period_days: i64,
}

impl UpdateTenantStatusHandler {
    pub fn new(transactions: Arc<dyn TransactionManager>, grace_period_days: i64) -> Self {
        Self {
            transactions,
            grace_period_days,
        }
    }

    pub async fn handle(&self, cmd: UpdateTenantStatusCommand) -> Result<Tenant, BillingError> {
        let now = Timestamp::now();
        let mut tx = self.transactions.begin().await?;

        let mut tenant = tx
            .find_tenant_for_update(cmd.tenant_id)
            .await?
            .ok_or(BillingError::TenantNotFound)?;
        let from = tenant.status();
        let before = tenant_snapshot(&tenant);

        match (from, cmd.status) {
            (TenantStatus::Suspended, TenantStatus::Active) => tenant.reinstate(now)?,
            (_, TenantStatus::Active) => {
                if !tenant.activate(now)? {
                    return Err(BillingError::invalid_transition(from.as_str(), "active"));
                }
            }
            (_, TenantStatus::Grace) => {
                let until = cmd
                    .grace_until
                    .unwrap_or_else(|| now.add_days(self.grace_period_days));
                tenant.enter_grace(until, now)?;
            }
            (_, TenantStatus::Suspended) => tenant.suspend(now)?,
            (_, TenantStatus::PendingPayment) => {
                return Err(BillingError::invalid_transition(
                    from.as_str(),
                    TenantStatus::PendingPayment.as_str(),
                ));
            }
        }
        tx.update_tenant(&tenant).await?;

        let entry = BillingAuditLog::builder(ActorType::Admin, actions::TENANT_STATUS_CHANGED)
            .actor(cmd.actor.id.clone())
            .target(targets::TENANT, tenant.id())
            .before(before)
            .after(tenant_snapshot(&tenant))
            .origin(&cmd.origin)
            .build(now);
        tx.append_audit_log(&entry).await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id = %tenant.id(),
            from = %from,
            to = %tenant.status(),
            actor = %cmd.actor.id,
            "Tenant status changed by admin"
        );
        Ok(tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::application::handlers::billing::test_support::{admin_actor, origin};
    use crate::domain::billing::EntitlementSource;
    use crate::ports::PageRequest;

    fn command(tenant_id: TenantId, status: TenantStatus) -> UpdateTenantStatusCommand {
        UpdateTenantStatusCommand {
            tenant_id,
            status,
            grace_until: None,
            actor: admin_actor(),
            origin: origin(),
        }
    }

    async fn seed(store: &InMemoryBillingStore, status: TenantStatus) -> Tenant {
        let now = Timestamp::now();
        let mut tenant = Tenant::new_active("Crew", now).unwrap();
        if matches!(status, TenantStatus::Grace | TenantStatus::Suspended) {
            tenant.enter_grace(now.add_days(1), now).unwrap();
        }
        if status == TenantStatus::Suspended {
            tenant.suspend(now).unwrap();
        }
        store.seed_tenant(tenant.clone()).await;
        tenant
    }

    // ══════════════════════════════════════════════════════════════
    // Status update
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn reinstates_suspended_tenant_with_audit() {
        let store = InMemoryBillingStore::new();
        let tenant = seed(&store, TenantStatus::Suspended).await;
        let handler = UpdateTenantStatusHandler::new(Arc::new(store.clone()), 14);

        let updated = handler
            .handle(command(tenant.id(), TenantStatus::Active))
            .await
            .unwrap();

        assert_eq!(updated.status(), TenantStatus::Active);
        let logs = store.all_audit_logs().await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, actions::TENANT_STATUS_CHANGED);
        assert_eq!(logs[0].before_json.as_ref().unwrap()["status"], "suspended");
        assert_eq!(logs[0].after_json.as_ref().unwrap()["status"], "active");
    }

    #[tokio::test]
    async fn grace_uses_explicit_deadline_when_given() {
        let store = InMemoryBillingStore::new();
        let tenant = seed(&store, TenantStatus::Active).await;
        let handler = UpdateTenantStatusHandler::new(Arc::new(store.clone()), 14);
        let deadline = Timestamp::now().add_days(3);
        let mut cmd = command(tenant.id(), TenantStatus::Grace);
        cmd.grace_until = Some(deadline);

        let updated = handler.handle(cmd).await.unwrap();

        assert_eq!(updated.grace_until(), Some(deadline));
    }

    #[tokio::test]
    async fn active_cannot_be_suspended_directly() {
        let store = InMemoryBillingStore::new();
        let tenant = seed(&store, TenantStatus::Active).await;
        let handler = UpdateTenantStatusHandler::new(Arc::new(store.clone()), 14);

        let err = handler
            .handle(command(tenant.id(), TenantStatus::Suspended))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::InvalidTransition { .. }));
        assert!(store.all_audit_logs().await.is_empty());
    }

    #[tokio::test]
    async fn noop_and_pending_targets_are_rejected() {
        let store = InMemoryBillingStore::new();
        let tenant = seed(&store, TenantStatus::Active).await;
        let handler = UpdateTenantStatusHandler::new(Arc::new(store.clone()), 14);

        for target in [TenantStatus::Active, TenantStatus::PendingPayment] {
            assert!(matches!(
                handler.handle(command(tenant.id(), target)).await,
                Err(BillingError::InvalidTransition { .. })
            ));
        }
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_found() {
        let store = InMemoryBillingStore::new();
        let handler = UpdateTenantStatusHandler::new(Arc::new(store), 14);
        assert_eq!(
            handler
                .handle(command(TenantId::new(), TenantStatus::Active))
                .await
                .unwrap_err(),
            BillingError::TenantNotFound
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Queries
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn list_filters_by_status() {
        let store = InMemoryBillingStore::new();
        seed(&store, TenantStatus::Active).await;
        seed(&store, TenantStatus::Suspended).await;
        let handler = ListTenantsHandler::new(Arc::new(store));

        let page = handler
            .handle(TenantFilter {
                status: Some(TenantStatus::Suspended),
                page: PageRequest::default(),
            })
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].status(), TenantStatus::Suspended);
    }

    #[tokio::test]
    async fn detail_collects_related_records() {
        let store = InMemoryBillingStore::new();
        let now = Timestamp::now();
        let tenant = seed(&store, TenantStatus::Active).await;
        store
            .seed_entitlement(
                Entitlement::grant(tenant.id(), "standard", EntitlementSource::LicenseKey, now)
                    .unwrap(),
            )
            .await;
        store
            .seed_admin(
                Admin::new_owner(tenant.id(), "owner@example.com", "Owner", "hash".into(), now)
                    .unwrap(),
            )
            .await;
        let handler = GetTenantDetailHandler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
        );

        let detail = handler.handle(tenant.id()).await.unwrap();

        assert_eq!(detail.tenant.id(), tenant.id());
        assert_eq!(detail.entitlements.len(), 1);
        assert_eq!(detail.admins.len(), 1);
        assert!(detail.subscription.is_none());
    }
}
