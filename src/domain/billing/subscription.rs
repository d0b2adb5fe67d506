//! Local mirror of a provider subscription.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SubscriptionId, TenantId, Timestamp};

/// Subscription record, written only by webhook reconciliation.
///
/// `status` keeps the provider's lifecycle string verbatim; use
/// [`SubscriptionState::classify`] to reason about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub tenant_id: TenantId,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: String,
    pub status: String,
    pub current_period_end: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    pub fn new(
        tenant_id: TenantId,
        stripe_customer_id: impl Into<String>,
        stripe_subscription_id: impl Into<String>,
        status: impl Into<String>,
        current_period_end: Option<Timestamp>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: SubscriptionId::new(),
            tenant_id,
            stripe_customer_id: stripe_customer_id.into(),
            stripe_subscription_id: stripe_subscription_id.into(),
            status: status.into(),
            current_period_end,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the provider's latest view of the subscription.
    ///
    /// A missing period end keeps the previously known one.
    pub fn apply_provider_update(
        &mut self,
        status: impl Into<String>,
        current_period_end: Option<Timestamp>,
        now: Timestamp,
    ) {
        self.status = status.into();
        if current_period_end.is_some() {
            self.current_period_end = current_period_end;
        }
        self.updated_at = now;
    }

    pub fn state(&self) -> SubscriptionState {
        SubscriptionState::classify(&self.status)
    }
}

/// What a provider subscription status means for the tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// `active`, `trialing`
    Current,
    /// `past_due`
    PastDue,
    /// `unpaid`
    Unpaid,
    /// `canceled`, `incomplete_expired`
    Ended,
    /// Anything else (`incomplete`, `paused`, future values).
    Other,
}

impl SubscriptionState {
    pub fn classify(status: &str) -> Self {
        match status {
            "active" | "trialing" => SubscriptionState::Current,
            "past_due" => SubscriptionState::PastDue,
            "unpaid" => SubscriptionState::Unpaid,
            "canceled" | "incomplete_expired" => SubscriptionState::Ended,
            _ => SubscriptionState::Other,
        }
    }
}

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_PAST_DUE: &str = "past_due";
pub const STATUS_CANCELED: &str = "canceled";
