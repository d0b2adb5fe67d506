//! SubscriptionRepository port.

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, TenantId};

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Most recently updated subscription of the tenant.
    async fn find_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<Subscription>, DomainError>;

    async fn find_by_stripe_subscription_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;
}
