//! Stripe webhook event types.
//!
//! Only the fields reconciliation needs are captured; everything else in
//! Stripe's schema is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::errors::BillingError;

/// Stripe webhook event (simplified).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp.
    #[serde(default)]
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,

    #[serde(default)]
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

impl StripeEvent {
    /// Parses a verified raw body. Events without an id are rejected.
    pub fn parse(payload: &[u8]) -> Result<Self, BillingError> {
        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| BillingError::InvalidWebhookPayload(e.to_string()))?;
        if event.id.trim().is_empty() {
            return Err(BillingError::InvalidWebhookPayload(
                "event id is empty".to_string(),
            ));
        }
        if event.event_type.trim().is_empty() {
            return Err(BillingError::InvalidWebhookPayload(
                "event type is empty".to_string(),
            ));
        }
        Ok(event)
    }

    /// Deserializes the data object as the given Stripe object type.
    pub fn object<T: serde::de::DeserializeOwned>(&self) -> Result<T, BillingError> {
        serde_json::from_value(self.data.object.clone()).map_err(|e| {
            BillingError::InvalidWebhookPayload(format!(
                "{} object: {}",
                self.event_type, e
            ))
        })
    }

    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::parse(&self.event_type)
    }
}

/// Event types reconciliation acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    CheckoutSessionCompleted,
    CustomerSubscriptionUpdated,
    CustomerSubscriptionDeleted,
    InvoicePaymentFailed,
    InvoicePaymentSucceeded,
    InvoicePaid,
    /// Recorded in the ledger and otherwise ignored.
    Unknown,
}

impl StripeEventType {
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.paid" => Self::InvoicePaid,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CustomerSubscriptionUpdated => "customer.subscription.updated",
            Self::CustomerSubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::InvoicePaid => "invoice.paid",
            Self::Unknown => "unknown",
        }
    }
}

/// `checkout.session` object.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// `subscription` object.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// `invoice` object.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
}

/// Builder for test events.
#[cfg(test)]
pub struct StripeEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
}

#[cfg(test)]
impl Default for StripeEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "checkout.session.completed".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
        }
    }
}

#[cfg(test)]
impl StripeEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn build(self) -> StripeEvent {
        StripeEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: StripeEventData {
                object: self.object,
                previous_attributes: None,
            },
            livemode: false,
            api_version: Some("2023-10-16".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ══════════════════════════════════════════════════════════════
    // Parsing
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_minimal_event() {
        let body = br#"{
            "id": "evt_1",
            "type": "invoice.payment_failed",
            "created": 1704067200,
            "data": {"object": {"id": "in_1", "subscription": "sub_1"}}
        }"#;

        let event = StripeEvent::parse(body).unwrap();
        assert_eq!(event.id, "evt_1");
        assert_eq!(event.parsed_type(), StripeEventType::InvoicePaymentFailed);
        assert!(!event.livemode);
        assert!(event.api_version.is_none());
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = StripeEvent::parse(b"not json").unwrap_err();
        assert!(matches!(err, BillingError::InvalidWebhookPayload(_)));
    }

    #[test]
    fn parse_rejects_empty_id() {
        let body = br#"{"id": "", "type": "invoice.paid", "data": {"object": {}}}"#;
        assert!(StripeEvent::parse(body).is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Typed objects
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn checkout_object_reads_metadata() {
        let event = StripeEventBuilder::new()
            .object(json!({
                "id": "cs_1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "metadata": {"tenant_id": "t-1", "plan_code": "pro"}
            }))
            .build();

        let session: CheckoutSessionObject = event.object().unwrap();
        assert_eq!(session.id, "cs_1");
        assert_eq!(session.subscription.as_deref(), Some("sub_1"));
        assert_eq!(session.metadata.get("plan_code").map(String::as_str), Some("pro"));
        assert!(session.client_reference_id.is_none());
    }

    #[test]
    fn subscription_object_requires_status() {
        let event = StripeEventBuilder::new()
            .event_type("customer.subscription.updated")
            .object(json!({"id": "sub_1", "customer": "cus_1"}))
            .build();

        let result: Result<SubscriptionObject, _> = event.object();
        assert!(matches!(result, Err(BillingError::InvalidWebhookPayload(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Event types
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn event_type_roundtrips_known_values() {
        for t in [
            StripeEventType::CheckoutSessionCompleted,
            StripeEventType::CustomerSubscriptionUpdated,
            StripeEventType::CustomerSubscriptionDeleted,
            StripeEventType::InvoicePaymentFailed,
            StripeEventType::InvoicePaymentSucceeded,
            StripeEventType::InvoicePaid,
        ] {
            assert_eq!(StripeEventType::parse(t.as_str()), t);
        }
    }

    #[test]
    fn unknown_event_types_are_tolerated() {
        assert_eq!(
            StripeEventType::parse("customer.tax_id.created"),
            StripeEventType::Unknown
        );
    }
}
