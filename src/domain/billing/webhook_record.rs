//! Webhook dedup ledger entries.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Outcome recorded for a processed webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookResult {
    /// Side effects were applied.
    Processed,
    /// Accepted but nothing to do (unknown type, unknown subscription).
    Ignored,
}

impl WebhookResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookResult::Processed => "processed",
            WebhookResult::Ignored => "ignored",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processed" => Some(WebhookResult::Processed),
            "ignored" => Some(WebhookResult::Ignored),
            _ => None,
        }
    }
}

/// One row of the ledger. `external_event_id` is unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEventRecord {
    pub external_event_id: String,
    pub event_type: String,
    pub result: WebhookResult,
    pub reason: Option<String>,
    pub payload: Option<String>,
    pub processed_at: Timestamp,
}

impl WebhookEventRecord {
    pub fn processed(
        external_event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            external_event_id: external_event_id.into(),
            event_type: event_type.into(),
            result: WebhookResult::Processed,
            reason: None,
            payload,
            processed_at: now,
        }
    }

    pub fn ignored(
        external_event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            external_event_id: external_event_id.into(),
            event_type: event_type.into(),
            result: WebhookResult::Ignored,
            reason: Some(reason.into()),
            payload,
            processed_at: now,
        }
    }
}
