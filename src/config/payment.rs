//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    pub stripe_api_key: SecretString,

    /// Stripe webhook signing secret. Absent or empty soft-disables the
    /// webhook endpoint.
    #[serde(default)]
    pub stripe_webhook_secret: Option<SecretString>,

    /// Stripe price for the subscription plan
    pub stripe_price_id: String,

    /// Where checkout sends the customer on success
    pub checkout_success_url: String,

    /// Where checkout sends the customer on cancel
    pub checkout_cancel_url: String,

    /// Where the billing portal returns to
    pub portal_return_url: String,

    /// Stripe API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    /// The webhook secret, if webhook processing is enabled.
    pub fn webhook_secret(&self) -> Option<&SecretString> {
        self.stripe_webhook_secret
            .as_ref()
            .filter(|s| !s.expose_secret().trim().is_empty())
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let api_key = self.stripe_api_key.expose_secret();
        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if !api_key.starts_with("sk_") && !api_key.starts_with("rk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if let Some(secret) = self.webhook_secret() {
            if !secret.expose_secret().starts_with("whsec_") {
                return Err(ValidationError::InvalidStripeWebhookSecret);
            }
        }
        if self.stripe_price_id.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_PRICE_ID"));
        }
        for url in [
            &self.checkout_success_url,
            &self.checkout_cancel_url,
            &self.portal_return_url,
        ] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ValidationError::InvalidRedirectUrl);
            }
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: SecretString::new(String::new()),
            stripe_webhook_secret: None,
            stripe_price_id: String::new(),
            checkout_success_url: String::new(),
            checkout_cancel_url: String::new(),
            portal_return_url: String::new(),
            api_base_url: default_api_base_url(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}
