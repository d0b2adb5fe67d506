//! Payment provider port for Stripe-hosted checkout and billing portal.
//!
//! Only session creation goes outbound. Subscription state flows back in
//! through webhooks, never through polling this port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::BillingError;
use crate::domain::foundation::TenantId;

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a subscription checkout session for a pending tenant.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Create a billing portal session so the customer can update payment.
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError>;
}

/// Request to create a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Sent as `client_reference_id` and `metadata[tenant_id]`.
    pub tenant_id: TenantId,

    /// Pre-fills the checkout form.
    pub customer_email: String,

    pub plan_code: String,

    pub success_url: String,

    pub cancel_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSession {
    pub id: String,
    pub url: String,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("network error: {0}")]
    Network(String),

    #[error("provider rejected request ({code}): {message}")]
    Provider { code: String, message: String },

    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),

    #[error("payment provider is not configured")]
    NotConfigured,
}

impl PaymentError {
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::Provider {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<PaymentError> for BillingError {
    fn from(err: PaymentError) -> Self {
        BillingError::Upstream(err.to_string())
    }
}
