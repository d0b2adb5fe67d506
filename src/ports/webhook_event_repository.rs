//! WebhookEventRepository port - the webhook dedup ledger.
//!
//! Stripe delivers at least once, so every event id is recorded in the same
//! transaction as its side effects. This port is the cheap pre-check; the
//! authoritative insert is
//! [`BillingTransaction::insert_webhook_event`](super::BillingTransaction::insert_webhook_event).

use async_trait::async_trait;

use crate::domain::billing::WebhookEventRecord;
use crate::domain::foundation::DomainError;

/// Result of attempting to record a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First time this event id was seen.
    Inserted,
    /// Another delivery already recorded it.
    AlreadyExists,
}

#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    async fn find_by_event_id(
        &self,
        external_event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;
}
