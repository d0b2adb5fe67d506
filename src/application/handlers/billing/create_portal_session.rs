//! CreatePortalSessionHandler - Stripe billing portal link for a tenant.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::TenantId;
use crate::ports::{PaymentProvider, PortalSession, SubscriptionRepository};

pub struct CreatePortalSessionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
    return_url: String,
}

impl CreatePortalSessionHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
        return_url: impl Into<String>,
    ) -> Self {
        Self {
            subscriptions,
            payment_provider,
            return_url: return_url.into(),
        }
    }

    pub async fn handle(&self, tenant_id: TenantId) -> Result<PortalSession, BillingError> {
        let subscription = self
            .subscriptions
            .find_by_tenant(tenant_id)
            .await?
            .ok_or(BillingError::SubscriptionNotFound)?;

        self.payment_provider
            .create_portal_session(&subscription.stripe_customer_id, &self.return_url)
            .await
            .map_err(|err| {
                tracing::error!(
                    tenant_id = %tenant_id,
                    error = %err,
                    "Portal session creation failed"
                );
                BillingError::from(err)
            })
    }
}
