//! GetBillingStatusHandler - tenant-facing billing summary.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::billing::{is_entitled, BillingError, TenantStatus};
use crate::domain::foundation::{TenantId, Timestamp};
use crate::ports::{EntitlementRepository, SubscriptionRepository, TenantRepository};

/// What a tenant sees about its own billing state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingStatusView {
    pub tenant_id: TenantId,
    pub status: TenantStatus,
    pub grace_until: Option<Timestamp>,
    /// True while at least one entitlement is active.
    pub entitled: bool,
    /// Plan codes of active entitlements, deduplicated.
    pub plan_codes: Vec<String>,
    pub subscription_status: Option<String>,
    pub current_period_end: Option<Timestamp>,
}

pub struct GetBillingStatusHandler {
    tenants: Arc<dyn TenantRepository>,
    entitlements: Arc<dyn EntitlementRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl GetBillingStatusHandler {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        entitlements: Arc<dyn EntitlementRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            tenants,
            entitlements,
            subscriptions,
        }
    }

    pub async fn handle(&self, tenant_id: TenantId) -> Result<BillingStatusView, BillingError> {
        let tenant = self
            .tenants
            .find_by_id(tenant_id)
            .await?
            .ok_or(BillingError::TenantNotFound)?;
        let entitlements = self.entitlements.list_for_tenant(tenant_id).await?;
        let subscription = self.subscriptions.find_by_tenant(tenant_id).await?;

        let mut plan_codes: Vec<String> = entitlements
            .iter()
            .filter(|e| e.is_active())
            .map(|e| e.plan_code.clone())
            .collect();
        plan_codes.sort();
        plan_codes.dedup();

        Ok(BillingStatusView {
            tenant_id,
            status: tenant.status(),
            grace_until: tenant.grace_until(),
            entitled: is_entitled(&entitlements),
            plan_codes,
            subscription_status: subscription.as_ref().map(|s| s.status.clone()),
            current_period_end: subscription.and_then(|s| s.current_period_end),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::{Entitlement, EntitlementSource, Subscription, Tenant};

    fn handler(store: &InMemoryBillingStore) -> GetBillingStatusHandler {
        GetBillingStatusHandler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
    }

    #[tokio::test]
    async fn summarises_entitlements_and_subscription() {
        let store = InMemoryBillingStore::new();
        let now = Timestamp::now();
        let tenant = Tenant::new_active("Crew", now).unwrap();
        store.seed_tenant(tenant.clone()).await;
        for plan in ["standard", "standard", "events"] {
            store
                .seed_entitlement(
                    Entitlement::grant(tenant.id(), plan, EntitlementSource::AdminGrant, now)
                        .unwrap(),
                )
                .await;
        }
        let period_end = now.add_days(30);
        store
            .seed_subscription(Subscription::new(
                tenant.id(),
                "cus_1",
                "sub_1",
                "active",
                Some(period_end),
                now,
            ))
            .await;

        let view = handler(&store).handle(tenant.id()).await.unwrap();

        assert_eq!(view.status, TenantStatus::Active);
        assert!(view.entitled);
        assert_eq!(view.plan_codes, vec!["events".to_string(), "standard".to_string()]);
        assert_eq!(view.subscription_status.as_deref(), Some("active"));
        assert_eq!(view.current_period_end, Some(period_end));
    }

    #[tokio::test]
    async fn tenant_without_entitlements_is_not_entitled() {
        let store = InMemoryBillingStore::new();
        let tenant = Tenant::new_pending_payment("Crew", Timestamp::now()).unwrap();
        store.seed_tenant(tenant.clone()).await;

        let view = handler(&store).handle(tenant.id()).await.unwrap();

        assert!(!view.entitled);
        assert!(view.plan_codes.is_empty());
        assert!(view.subscription_status.is_none());
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_found() {
        let store = InMemoryBillingStore::new();
        assert_eq!(
            handler(&store).handle(TenantId::new()).await.unwrap_err(),
            BillingError::TenantNotFound
        );
    }
}
