//! HandleStripeWebhookHandler - idempotent reconciliation of Stripe events.
//!
//! # Algorithm
//!
//! 1. Look the event id up in the ledger. A known id is a duplicate and
//!    returns `Ok(false)` without touching state.
//! 2. Open a transaction and apply the event's effects on tenant,
//!    entitlement and subscription state, with audit entries.
//! 3. Insert the ledger row in the same transaction. If a concurrent
//!    delivery got there first the transaction is dropped and the call
//!    returns `Ok(false)`.
//! 4. Commit and return `Ok(true)`.
//!
//! Any error rolls the whole transaction back. Errors other than malformed
//! payloads are retryable: redelivery is safe because of step 1.
//!
//! The signature must be verified before this handler is called.

use std::sync::Arc;

use serde_json::json;

use crate::domain::billing::{
    actions, targets, ActorType, BillingAuditLog, BillingAuditLogBuilder, BillingError,
    CheckoutSessionObject, Entitlement, EntitlementSource, InvoiceObject, StripeEvent,
    StripeEventType, Subscription, SubscriptionObject, SubscriptionState, Tenant, TenantStatus,
    WebhookEventRecord, STATUS_ACTIVE, STATUS_CANCELED, STATUS_PAST_DUE,
};
use crate::domain::foundation::{TenantId, Timestamp};
use crate::ports::{BillingTransaction, SaveResult, TransactionManager, WebhookEventRepository};

use super::tenant_snapshot;

/// Command carrying a verified event and its raw body.
#[derive(Debug, Clone)]
pub struct HandleStripeWebhookCommand {
    pub event: StripeEvent,
    /// Stored verbatim in the ledger.
    pub raw_body: Vec<u8>,
}

/// Tunables for reconciliation.
#[derive(Debug, Clone)]
pub struct ReconciliationSettings {
    /// Length of the grace period entered on payment failure.
    pub grace_period_days: i64,
    /// Plan for subscription entitlements when checkout metadata has none.
    pub default_plan_code: String,
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        Self {
            grace_period_days: 14,
            default_plan_code: "standard".to_string(),
        }
    }
}

enum Outcome {
    Processed,
    Ignored(&'static str),
}

pub struct HandleStripeWebhookHandler {
    ledger: Arc<dyn WebhookEventRepository>,
    transactions: Arc<dyn TransactionManager>,
    settings: ReconciliationSettings,
}

impl HandleStripeWebhookHandler {
    pub fn new(
        ledger: Arc<dyn WebhookEventRepository>,
        transactions: Arc<dyn TransactionManager>,
        settings: ReconciliationSettings,
    ) -> Self {
        Self {
            ledger,
            transactions,
            settings,
        }
    }

    /// Returns `true` if the event was applied, `false` for a duplicate.
    pub async fn handle(&self, cmd: HandleStripeWebhookCommand) -> Result<bool, BillingError> {
        let event = &cmd.event;

        if self.ledger.find_by_event_id(&event.id).await?.is_some() {
            tracing::info!(
                event_id = %event.id,
                event_type = %event.event_type,
                "Duplicate webhook delivery skipped"
            );
            return Ok(false);
        }

        let now = Timestamp::now();
        let mut tx = self.transactions.begin().await?;

        let outcome = self.apply(&mut *tx, event, now).await?;

        let payload = Some(String::from_utf8_lossy(&cmd.raw_body).into_owned());
        let record = match outcome {
            Outcome::Processed => {
                WebhookEventRecord::processed(&event.id, &event.event_type, payload, now)
            }
            Outcome::Ignored(reason) => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    reason,
                    "Webhook event ignored"
                );
                WebhookEventRecord::ignored(&event.id, &event.event_type, reason, payload, now)
            }
        };

        if tx.insert_webhook_event(&record).await? == SaveResult::AlreadyExists {
            tracing::info!(
                event_id = %event.id,
                "Concurrent duplicate webhook delivery rolled back"
            );
            return Ok(false);
        }

        tx.commit().await?;
        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            result = record.result.as_str(),
            "Webhook event recorded"
        );
        Ok(true)
    }

    async fn apply(
        &self,
        tx: &mut dyn BillingTransaction,
        event: &StripeEvent,
        now: Timestamp,
    ) -> Result<Outcome, BillingError> {
        match event.parsed_type() {
            StripeEventType::CheckoutSessionCompleted => {
                self.on_checkout_completed(tx, event, now).await
            }
            StripeEventType::CustomerSubscriptionUpdated => {
                self.on_subscription_updated(tx, event, now).await
            }
            StripeEventType::CustomerSubscriptionDeleted => {
                self.on_subscription_deleted(tx, event, now).await
            }
            StripeEventType::InvoicePaymentFailed => self.on_payment_failed(tx, event, now).await,
            StripeEventType::InvoicePaymentSucceeded | StripeEventType::InvoicePaid => {
                self.on_payment_succeeded(tx, event, now).await
            }
            StripeEventType::Unknown => Ok(Outcome::Ignored("unhandled event type")),
        }
    }

    // ─── checkout.session.completed ────────────────────────────────

    async fn on_checkout_completed(
        &self,
        tx: &mut dyn BillingTransaction,
        event: &StripeEvent,
        now: Timestamp,
    ) -> Result<Outcome, BillingError> {
        let session: CheckoutSessionObject = event.object()?;

        let (Some(customer_id), Some(stripe_subscription_id)) =
            (session.customer.as_deref(), session.subscription.as_deref())
        else {
            return Err(BillingError::InvalidWebhookPayload(
                "checkout session has no customer or subscription".to_string(),
            ));
        };

        let mut tenant = match tx.find_tenant_by_pending_session(&session.id).await? {
            Some(tenant) => tenant,
            None => {
                let Some(tenant_id) = referenced_tenant(&session) else {
                    return Ok(Outcome::Ignored("checkout session references no tenant"));
                };
                // Checkout may complete before the subscribe transaction is
                // visible. Failing here makes Stripe retry.
                tx.find_tenant_for_update(tenant_id)
                    .await?
                    .ok_or(BillingError::TenantNotFound)?
            }
        };

        let before = tenant_snapshot(&tenant);
        match tenant.status() {
            TenantStatus::PendingPayment | TenantStatus::Grace => {
                tenant.activate(now)?;
                tx.update_tenant(&tenant).await?;
            }
            TenantStatus::Active => {}
            TenantStatus::Suspended => {
                tracing::warn!(
                    tenant_id = %tenant.id(),
                    event_id = %event.id,
                    "Checkout completed for suspended tenant; reinstatement stays with admins"
                );
            }
        }

        let subscription = match tx.find_subscription_by_stripe_id(stripe_subscription_id).await? {
            Some(mut existing) => {
                existing.stripe_customer_id = customer_id.to_string();
                existing.apply_provider_update(STATUS_ACTIVE, None, now);
                existing
            }
            None => Subscription::new(
                tenant.id(),
                customer_id,
                stripe_subscription_id,
                STATUS_ACTIVE,
                None,
                now,
            ),
        };
        tx.upsert_subscription(&subscription).await?;

        let existing = tx.list_entitlements(tenant.id()).await?;
        let entitlement_id = match existing
            .iter()
            .find(|e| e.source == EntitlementSource::Subscription && e.is_active())
        {
            Some(active) => active.id,
            None => {
                let plan_code = session
                    .metadata
                    .get("plan_code")
                    .map(String::as_str)
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or(&self.settings.default_plan_code);
                let entitlement = Entitlement::grant(
                    tenant.id(),
                    plan_code,
                    EntitlementSource::Subscription,
                    now,
                )?;
                tx.insert_entitlement(&entitlement).await?;
                entitlement.id
            }
        };

        let mut after = tenant_snapshot(&tenant);
        after["stripe_subscription_id"] = json!(subscription.stripe_subscription_id);
        after["entitlement_id"] = json!(entitlement_id.to_string());
        let entry = webhook_audit(event, actions::WEBHOOK_CHECKOUT_COMPLETED, &tenant)
            .before(before)
            .after(after)
            .build(now);
        tx.append_audit_log(&entry).await?;

        tracing::info!(
            tenant_id = %tenant.id(),
            event_id = %event.id,
            "Checkout completed, tenant activated"
        );
        Ok(Outcome::Processed)
    }

    // ─── customer.subscription.updated ─────────────────────────────

    async fn on_subscription_updated(
        &self,
        tx: &mut dyn BillingTransaction,
        event: &StripeEvent,
        now: Timestamp,
    ) -> Result<Outcome, BillingError> {
        let object: SubscriptionObject = event.object()?;
        let Some(mut subscription) = tx.find_subscription_by_stripe_id(&object.id).await? else {
            return Ok(Outcome::Ignored("unknown subscription"));
        };
        let mut tenant = tx
            .find_tenant_for_update(subscription.tenant_id)
            .await?
            .ok_or(BillingError::TenantNotFound)?;

        let before = tenant_snapshot(&tenant);
        let previous_status = subscription.status.clone();
        subscription.apply_provider_update(
            &object.status,
            object.current_period_end.and_then(Timestamp::from_unix_secs),
            now,
        );
        tx.upsert_subscription(&subscription).await?;

        match SubscriptionState::classify(&object.status) {
            SubscriptionState::Current => {
                if matches!(tenant.status(), TenantStatus::Grace | TenantStatus::PendingPayment) {
                    tenant.activate(now)?;
                    tx.update_tenant(&tenant).await?;
                }
            }
            SubscriptionState::PastDue => {
                if tenant.status() == TenantStatus::Active {
                    tenant.enter_grace(self.grace_deadline(now), now)?;
                    tx.update_tenant(&tenant).await?;
                }
            }
            SubscriptionState::Unpaid => {
                self.suspend_via_grace(tx, &mut tenant, event, now).await?;
            }
            SubscriptionState::Ended => {
                revoke_subscription_entitlements(tx, tenant.id(), now).await?;
                self.suspend_via_grace(tx, &mut tenant, event, now).await?;
            }
            SubscriptionState::Other => {}
        }

        let mut after = tenant_snapshot(&tenant);
        after["subscription_status"] = json!(subscription.status);
        let entry = webhook_audit(event, actions::WEBHOOK_SUBSCRIPTION_UPDATED, &tenant)
            .before(merge(before, "subscription_status", json!(previous_status)))
            .after(after)
            .build(now);
        tx.append_audit_log(&entry).await?;

        Ok(Outcome::Processed)
    }

    // ─── customer.subscription.deleted ─────────────────────────────

    async fn on_subscription_deleted(
        &self,
        tx: &mut dyn BillingTransaction,
        event: &StripeEvent,
        now: Timestamp,
    ) -> Result<Outcome, BillingError> {
        let object: SubscriptionObject = event.object()?;
        let Some(mut subscription) = tx.find_subscription_by_stripe_id(&object.id).await? else {
            return Ok(Outcome::Ignored("unknown subscription"));
        };
        let mut tenant = tx
            .find_tenant_for_update(subscription.tenant_id)
            .await?
            .ok_or(BillingError::TenantNotFound)?;

        let before = tenant_snapshot(&tenant);
        subscription.apply_provider_update(
            STATUS_CANCELED,
            object.current_period_end.and_then(Timestamp::from_unix_secs),
            now,
        );
        tx.upsert_subscription(&subscription).await?;

        let revoked = revoke_subscription_entitlements(tx, tenant.id(), now).await?;
        self.suspend_via_grace(tx, &mut tenant, event, now).await?;

        let mut after = tenant_snapshot(&tenant);
        after["subscription_status"] = json!(subscription.status);
        after["revoked_entitlements"] = json!(revoked);
        let entry = webhook_audit(event, actions::WEBHOOK_SUBSCRIPTION_DELETED, &tenant)
            .before(before)
            .after(after)
            .build(now);
        tx.append_audit_log(&entry).await?;

        tracing::info!(
            tenant_id = %tenant.id(),
            event_id = %event.id,
            "Subscription deleted, tenant suspended"
        );
        Ok(Outcome::Processed)
    }

    // ─── invoice.payment_failed ────────────────────────────────────

    async fn on_payment_failed(
        &self,
        tx: &mut dyn BillingTransaction,
        event: &StripeEvent,
        now: Timestamp,
    ) -> Result<Outcome, BillingError> {
        let invoice: InvoiceObject = event.object()?;
        let Some((mut subscription, mut tenant)) = load_invoice_target(tx, &invoice).await? else {
            return Ok(Outcome::Ignored("invoice for unknown subscription"));
        };

        let before = tenant_snapshot(&tenant);
        subscription.apply_provider_update(STATUS_PAST_DUE, None, now);
        tx.upsert_subscription(&subscription).await?;

        match tenant.status() {
            TenantStatus::Active => {
                tenant.enter_grace(self.grace_deadline(now), now)?;
                tx.update_tenant(&tenant).await?;
            }
            TenantStatus::Grace if tenant.is_grace_expired(now) => {
                tenant.suspend(now)?;
                tx.update_tenant(&tenant).await?;
            }
            TenantStatus::Grace | TenantStatus::PendingPayment | TenantStatus::Suspended => {}
        }

        let entry = webhook_audit(event, actions::WEBHOOK_PAYMENT_FAILED, &tenant)
            .before(before)
            .after(tenant_snapshot(&tenant))
            .build(now);
        tx.append_audit_log(&entry).await?;

        tracing::warn!(
            tenant_id = %tenant.id(),
            event_id = %event.id,
            status = %tenant.status(),
            "Invoice payment failed"
        );
        Ok(Outcome::Processed)
    }

    // ─── invoice.payment_succeeded / invoice.paid ──────────────────

    async fn on_payment_succeeded(
        &self,
        tx: &mut dyn BillingTransaction,
        event: &StripeEvent,
        now: Timestamp,
    ) -> Result<Outcome, BillingError> {
        let invoice: InvoiceObject = event.object()?;
        let Some((mut subscription, mut tenant)) = load_invoice_target(tx, &invoice).await? else {
            return Ok(Outcome::Ignored("invoice for unknown subscription"));
        };

        let before = tenant_snapshot(&tenant);
        // A late invoice never revives a canceled subscription.
        if subscription.status != STATUS_CANCELED {
            subscription.apply_provider_update(STATUS_ACTIVE, None, now);
            tx.upsert_subscription(&subscription).await?;
        }
        if tenant.status() == TenantStatus::Grace {
            tenant.activate(now)?;
            tx.update_tenant(&tenant).await?;
        }

        let mut after = tenant_snapshot(&tenant);
        after["subscription_status"] = json!(subscription.status);
        let entry = webhook_audit(event, actions::WEBHOOK_PAYMENT_SUCCEEDED, &tenant)
            .before(before)
            .after(after)
            .build(now);
        tx.append_audit_log(&entry).await?;

        Ok(Outcome::Processed)
    }

    // ─── helpers ───────────────────────────────────────────────────

    fn grace_deadline(&self, now: Timestamp) -> Timestamp {
        now.add_days(self.settings.grace_period_days)
    }

    /// Suspends the tenant, persisting an intermediate grace step first when
    /// the tenant is still active.
    async fn suspend_via_grace(
        &self,
        tx: &mut dyn BillingTransaction,
        tenant: &mut Tenant,
        event: &StripeEvent,
        now: Timestamp,
    ) -> Result<(), BillingError> {
        if tenant.status() == TenantStatus::Active {
            let before = tenant_snapshot(tenant);
            tenant.enter_grace(self.grace_deadline(now), now)?;
            tx.update_tenant(tenant).await?;
            let entry = webhook_audit(event, actions::TENANT_STATUS_CHANGED, tenant)
                .before(before)
                .after(tenant_snapshot(tenant))
                .build(now);
            tx.append_audit_log(&entry).await?;
        }

        if tenant.status() == TenantStatus::Grace {
            tenant.suspend(now)?;
            tx.update_tenant(tenant).await?;
        }
        Ok(())
    }
}

/// Tenant id carried by checkout metadata or `client_reference_id`.
fn referenced_tenant(session: &CheckoutSessionObject) -> Option<TenantId> {
    session
        .metadata
        .get("tenant_id")
        .or(session.client_reference_id.as_ref())
        .and_then(|raw| raw.parse().ok())
}

async fn load_invoice_target(
    tx: &mut dyn BillingTransaction,
    invoice: &InvoiceObject,
) -> Result<Option<(Subscription, Tenant)>, BillingError> {
    let Some(stripe_subscription_id) = invoice.subscription.as_deref() else {
        return Ok(None);
    };
    let Some(subscription) = tx.find_subscription_by_stripe_id(stripe_subscription_id).await? else {
        return Ok(None);
    };
    let tenant = tx
        .find_tenant_for_update(subscription.tenant_id)
        .await?
        .ok_or(BillingError::TenantNotFound)?;
    Ok(Some((subscription, tenant)))
}

/// Revokes every active subscription-sourced entitlement; returns their ids.
async fn revoke_subscription_entitlements(
    tx: &mut dyn BillingTransaction,
    tenant_id: TenantId,
    now: Timestamp,
) -> Result<Vec<String>, BillingError> {
    let mut revoked = Vec::new();
    for mut entitlement in tx.list_entitlements(tenant_id).await? {
        if entitlement.source == EntitlementSource::Subscription && entitlement.is_active() {
            entitlement.revoke(now)?;
            tx.update_entitlement(&entitlement).await?;
            revoked.push(entitlement.id.to_string());
        }
    }
    Ok(revoked)
}

fn webhook_audit(event: &StripeEvent, action: &str, tenant: &Tenant) -> BillingAuditLogBuilder {
    BillingAuditLog::builder(ActorType::Webhook, action)
        .actor(event.id.clone())
        .target(targets::TENANT, tenant.id())
}

fn merge(
    mut snapshot: serde_json::Value,
    key: &str,
    value: serde_json::Value,
) -> serde_json::Value {
    if let Some(map) = snapshot.as_object_mut() {
        map.insert(key.to_string(), value);
    }
    snapshot
}
