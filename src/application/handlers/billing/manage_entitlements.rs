//! Admin entitlement grant and revoke.
//!
//! A revoked entitlement is the hard stop of the billing guard: the tenant
//! loses all access while any revoked entitlement exists.

use std::sync::Arc;

use serde_json::json;

use crate::domain::billing::{
    actions, targets, ActorType, BillingAuditLog, BillingError, Entitlement, EntitlementSource,
    RequestOrigin,
};
use crate::domain::foundation::{EntitlementId, TenantId, Timestamp};
use crate::ports::{AdminActor, TransactionManager};

fn entitlement_snapshot(entitlement: &Entitlement) -> serde_json::Value {
    json!({
        "tenant_id": entitlement.tenant_id.to_string(),
        "plan_code": entitlement.plan_code,
        "source": entitlement.source.as_str(),
        "revoked_at": entitlement.revoked_at,
    })
}

// ─── grant ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GrantEntitlementCommand {
    pub tenant_id: TenantId,
    pub plan_code: String,
    pub actor: AdminActor,
    pub origin: RequestOrigin,
}

pub struct GrantEntitlementHandler {
    transactions: Arc<dyn TransactionManager>,
}

impl GrantEntitlementHandler {
    pub fn new(transactions: Arc<dyn TransactionManager>) -> Self {
        Self { transactions }
    }

    pub async fn handle(&self, cmd: GrantEntitlementCommand) -> Result<Entitlement, BillingError> {
        let now = Timestamp::now();
        let entitlement = Entitlement::grant(
            cmd.tenant_id,
            cmd.plan_code.as_str(),
            EntitlementSource::AdminGrant,
            now,
        )?;

        let mut tx = self.transactions.begin().await?;
        tx.find_tenant_for_update(cmd.tenant_id)
            .await?
            .ok_or(BillingError::TenantNotFound)?;
        tx.insert_entitlement(&entitlement).await?;

        let entry = BillingAuditLog::builder(ActorType::Admin, actions::ENTITLEMENT_GRANTED)
            .actor(cmd.actor.id.clone())
            .target(targets::ENTITLEMENT, entitlement.id)
            .after(entitlement_snapshot(&entitlement))
            .origin(&cmd.origin)
            .build(now);
        tx.append_audit_log(&entry).await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id = %cmd.tenant_id,
            entitlement_id = %entitlement.id,
            plan_code = %entitlement.plan_code,
            "Entitlement granted"
        );
        Ok(entitlement)
    }
}

// ─── revoke ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RevokeEntitlementCommand {
    pub tenant_id: TenantId,
    pub entitlement_id: EntitlementId,
    pub actor: AdminActor,
    pub origin: RequestOrigin,
}

pub struct RevokeEntitlementHandler {
    transactions: Arc<dyn TransactionManager>,
}

impl RevokeEntitlementHandler {
    pub fn new(transactions: Arc<dyn TransactionManager>) -> Self {
        Self { transactions }
    }

    pub async fn handle(&self, cmd: RevokeEntitlementCommand) -> Result<Entitlement, BillingError> {
        let now = Timestamp::now();
        let mut tx = self.transactions.begin().await?;

        let mut entitlement = tx
            .list_entitlements(cmd.tenant_id)
            .await?
            .into_iter()
            .find(|e| e.id == cmd.entitlement_id)
            .ok_or(BillingError::EntitlementNotFound)?;
        let before = entitlement_snapshot(&entitlement);

        entitlement.revoke(now)?;
        tx.update_entitlement(&entitlement).await?;

        let entry = BillingAuditLog::builder(ActorType::Admin, actions::ENTITLEMENT_REVOKED)
            .actor(cmd.actor.id.clone())
            .target(targets::ENTITLEMENT, entitlement.id)
            .before(before)
            .after(entitlement_snapshot(&entitlement))
            .origin(&cmd.origin)
            .build(now);
        tx.append_audit_log(&entry).await?;
        tx.commit().await?;

        tracing::warn!(
            tenant_id = %cmd.tenant_id,
            entitlement_id = %entitlement.id,
            actor = %cmd.actor.id,
            "Entitlement revoked; tenant access blocked"
        );
        Ok(entitlement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::application::handlers::billing::test_support::{admin_actor, origin};
    use crate::domain::billing::Tenant;
    use crate::ports::EntitlementRepository;

    async fn seeded() -> (InMemoryBillingStore, Tenant) {
        let store = InMemoryBillingStore::new();
        let tenant = Tenant::new_active("Crew", Timestamp::now()).unwrap();
        store.seed_tenant(tenant.clone()).await;
        (store, tenant)
    }

    fn grant(tenant_id: TenantId, plan: &str) -> GrantEntitlementCommand {
        GrantEntitlementCommand {
            tenant_id,
            plan_code: plan.to_string(),
            actor: admin_actor(),
            origin: origin(),
        }
    }

    fn revoke(tenant_id: TenantId, entitlement_id: EntitlementId) -> RevokeEntitlementCommand {
        RevokeEntitlementCommand {
            tenant_id,
            entitlement_id,
            actor: admin_actor(),
            origin: origin(),
        }
    }

    #[tokio::test]
    async fn grant_creates_admin_sourced_entitlement() {
        let (store, tenant) = seeded().await;

        let granted = GrantEntitlementHandler::new(Arc::new(store.clone()))
            .handle(grant(tenant.id(), "events"))
            .await
            .unwrap();

        assert_eq!(granted.source, EntitlementSource::AdminGrant);
        assert_eq!(store.all_entitlements().await.len(), 1);
        assert_eq!(store.all_audit_logs().await[0].action, actions::ENTITLEMENT_GRANTED);
    }

    #[tokio::test]
    async fn grant_for_unknown_tenant_writes_nothing() {
        let (store, _) = seeded().await;

        let err = GrantEntitlementHandler::new(Arc::new(store.clone()))
            .handle(grant(TenantId::new(), "events"))
            .await
            .unwrap_err();

        assert_eq!(err, BillingError::TenantNotFound);
        assert!(store.all_entitlements().await.is_empty());
    }

    #[tokio::test]
    async fn revoke_marks_tenant_as_revoked() {
        let (store, tenant) = seeded().await;
        let granted = GrantEntitlementHandler::new(Arc::new(store.clone()))
            .handle(grant(tenant.id(), "standard"))
            .await
            .unwrap();
        let handler = RevokeEntitlementHandler::new(Arc::new(store.clone()));

        let revoked = handler.handle(revoke(tenant.id(), granted.id)).await.unwrap();

        assert!(revoked.revoked_at.is_some());
        assert!(store.has_revoked(tenant.id()).await.unwrap());

        let again = handler.handle(revoke(tenant.id(), granted.id)).await.unwrap_err();
        assert_eq!(again, BillingError::EntitlementAlreadyRevoked);
        assert_eq!(store.all_audit_logs().await.len(), 2);
    }

    #[tokio::test]
    async fn revoke_checks_tenant_ownership() {
        let (store, tenant) = seeded().await;
        let granted = GrantEntitlementHandler::new(Arc::new(store.clone()))
            .handle(grant(tenant.id(), "standard"))
            .await
            .unwrap();

        let err = RevokeEntitlementHandler::new(Arc::new(store.clone()))
            .handle(revoke(TenantId::new(), granted.id))
            .await
            .unwrap_err();

        assert_eq!(err, BillingError::EntitlementNotFound);
    }
}
