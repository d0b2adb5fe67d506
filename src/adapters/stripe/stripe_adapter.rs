//! Stripe payment provider adapter.
//!
//! Talks to the Stripe REST API with form-encoded requests, authenticating
//! with the secret key as the basic-auth username.
//!
//! ```ignore
//! let config = StripeConfig::new(api_key, price_id);
//! let adapter = StripePaymentAdapter::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, PaymentError, PaymentProvider, PortalSession,
};

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Recurring price the checkout session subscribes to.
    price_id: String,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: SecretString, price_id: impl Into<String>) -> Self {
        Self {
            api_key,
            price_id: price_id.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

impl StripePaymentAdapter {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn checkout_params(&self, request: &CreateCheckoutRequest) -> Vec<(&'static str, String)> {
        let tenant_id = request.tenant_id.to_string();
        vec![
            ("mode", "subscription".to_string()),
            ("customer_email", request.customer_email.clone()),
            ("line_items[0][price]", self.config.price_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("client_reference_id", tenant_id.clone()),
            ("metadata[tenant_id]", tenant_id.clone()),
            ("metadata[plan_code]", request.plan_code.clone()),
            ("subscription_data[metadata][tenant_id]", tenant_id),
        ]
    }

    async fn post_form(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<SessionResponse, PaymentError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status.as_u16(), &body));
        }

        response
            .json::<SessionResponse>()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }
}

/// Maps a non-2xx Stripe response to a provider error.
fn provider_error(status: u16, body: &str) -> PaymentError {
    match serde_json::from_str::<StripeErrorEnvelope>(body) {
        Ok(envelope) => {
            let code = envelope
                .error
                .code
                .or(envelope.error.error_type)
                .unwrap_or_else(|| status.to_string());
            let message = envelope
                .error
                .message
                .unwrap_or_else(|| "no message".to_string());
            PaymentError::provider(code, message)
        }
        Err(_) => PaymentError::provider(status.to_string(), "unparseable error response"),
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let params = self.checkout_params(&request);
        let session = self.post_form("/v1/checkout/sessions", &params).await?;

        let url = session.url.ok_or_else(|| {
            PaymentError::InvalidResponse("checkout session has no url".to_string())
        })?;

        tracing::debug!(
            tenant_id = %request.tenant_id,
            session_id = %session.id,
            "Stripe checkout session created"
        );
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError> {
        let params = [
            ("customer", customer_id.to_string()),
            ("return_url", return_url.to_string()),
        ];
        let session = self.post_form("/v1/billing_portal/sessions", &params).await?;

        let url = session.url.ok_or_else(|| {
            PaymentError::InvalidResponse("portal session has no url".to_string())
        })?;

        Ok(PortalSession {
            id: session.id,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::TenantId;

    fn adapter() -> StripePaymentAdapter {
        StripePaymentAdapter::new(StripeConfig::new(
            SecretString::new("sk_test_key".to_string()),
            "price_standard",
        ))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_defaults_to_stripe_api() {
        let config = StripeConfig::new(SecretString::new("k".to_string()), "price");
        assert_eq!(config.api_base_url, "https://api.stripe.com");
    }

    #[test]
    fn config_base_url_drops_trailing_slash() {
        let config = StripeConfig::new(SecretString::new("k".to_string()), "price")
            .with_base_url("http://localhost:12111/");
        assert_eq!(config.api_base_url, "http://localhost:12111");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Request building
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn checkout_params_carry_tenant_reference() {
        let tenant_id = TenantId::new();
        let params = adapter().checkout_params(&CreateCheckoutRequest {
            tenant_id,
            customer_email: "owner@example.com".to_string(),
            plan_code: "standard".to_string(),
            success_url: "https://app/ok".to_string(),
            cancel_url: "https://app/cancel".to_string(),
        });

        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("mode").as_deref(), Some("subscription"));
        assert_eq!(get("client_reference_id"), Some(tenant_id.to_string()));
        assert_eq!(get("metadata[tenant_id]"), Some(tenant_id.to_string()));
        assert_eq!(get("metadata[plan_code]").as_deref(), Some("standard"));
        assert_eq!(get("line_items[0][price]").as_deref(), Some("price_standard"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error mapping
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn provider_error_reads_stripe_envelope() {
        let body = r#"{"error":{"code":"resource_missing","message":"No such customer",
            "type":"invalid_request_error"}}"#;
        assert_eq!(
            provider_error(404, body),
            PaymentError::provider("resource_missing", "No such customer")
        );
    }

    #[test]
    fn provider_error_falls_back_to_type_then_status() {
        let body = r#"{"error":{"type":"api_error"}}"#;
        assert_eq!(
            provider_error(500, body),
            PaymentError::provider("api_error", "no message")
        );
        assert_eq!(
            provider_error(502, "<html>bad gateway</html>"),
            PaymentError::provider("502", "unparseable error response")
        );
    }
}
