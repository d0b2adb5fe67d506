//! SubscribeHandler - public checkout initiation for a new tenant.
//!
//! Creates the Stripe checkout session before persisting anything, so a
//! provider failure leaves no orphaned pending tenant behind. The tenant is
//! activated later by the `checkout.session.completed` webhook.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use crate::domain::billing::{
    actions, targets, validate_display_name, validate_email, validate_password, ActorType, Admin,
    BillingAuditLog, BillingError, RequestOrigin, Tenant,
};
use crate::domain::foundation::{TenantId, Timestamp};
use crate::ports::{CreateCheckoutRequest, PasswordHasher, PaymentProvider, TransactionManager};

use super::tenant_snapshot;

/// Where Stripe sends the customer after checkout, and what they buy.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub success_url: String,
    pub cancel_url: String,
    pub plan_code: String,
}

#[derive(Debug, Clone)]
pub struct SubscribeCommand {
    pub email: String,
    pub password: SecretString,
    pub display_name: String,
    pub tenant_name: String,
    pub origin: RequestOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeResult {
    pub tenant_id: TenantId,
    pub checkout_url: String,
}

pub struct SubscribeHandler {
    transactions: Arc<dyn TransactionManager>,
    payment_provider: Arc<dyn PaymentProvider>,
    password_hasher: Arc<dyn PasswordHasher>,
    settings: CheckoutSettings,
}

impl SubscribeHandler {
    pub fn new(
        transactions: Arc<dyn TransactionManager>,
        payment_provider: Arc<dyn PaymentProvider>,
        password_hasher: Arc<dyn PasswordHasher>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            transactions,
            payment_provider,
            password_hasher,
            settings,
        }
    }

    pub async fn handle(&self, cmd: SubscribeCommand) -> Result<SubscribeResult, BillingError> {
        let now = Timestamp::now();

        // 1. Validate inputs
        let email = validate_email(&cmd.email)?;
        validate_password(cmd.password.expose_secret())?;
        let display_name = validate_display_name(&cmd.display_name)?;

        // 2. Build pending tenant and owner
        let mut tenant = Tenant::new_pending_payment(cmd.tenant_name.as_str(), now)?;
        let password_hash = self.password_hasher.hash(&cmd.password).await?;
        let admin = Admin::new_owner(tenant.id(), &email, &display_name, password_hash, now)?;

        // 3. Create checkout session
        let session = self
            .payment_provider
            .create_checkout_session(CreateCheckoutRequest {
                tenant_id: tenant.id(),
                customer_email: email.clone(),
                plan_code: self.settings.plan_code.clone(),
                success_url: self.settings.success_url.clone(),
                cancel_url: self.settings.cancel_url.clone(),
            })
            .await
            .map_err(|err| {
                tracing::error!(
                    tenant_id = %tenant.id(),
                    error = %err,
                    "Checkout session creation failed"
                );
                BillingError::from(err)
            })?;
        tenant.attach_checkout_session(&session.id, now)?;

        // 4. Persist
        let mut tx = self.transactions.begin().await?;
        tx.insert_tenant(&tenant).await?;
        tx.insert_admin(&admin).await?;
        let mut after = tenant_snapshot(&tenant);
        after["checkout_session_id"] = json!(session.id);
        let entry = BillingAuditLog::builder(ActorType::Admin, actions::TENANT_SUBSCRIBE_INITIATED)
            .actor(admin.id.to_string())
            .target(targets::TENANT, tenant.id())
            .after(after)
            .origin(&cmd.origin)
            .build(now);
        tx.append_audit_log(&entry).await?;
        tx.commit().await?;

        tracing::info!(tenant_id = %tenant.id(), session_id = %session.id, "Checkout initiated");
        Ok(SubscribeResult {
            tenant_id: tenant.id(),
            checkout_url: session.url,
        })
    }
}
