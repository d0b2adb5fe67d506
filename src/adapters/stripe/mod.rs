//! Stripe payment provider adapters.
//!
//! - `StripePaymentAdapter` calls the Stripe REST API for checkout and
//!   billing portal sessions.
//! - `MockPaymentProvider` records requests and injects failures for tests
//!   and local development.
//!
//! Webhook verification and event parsing live in the billing domain; the
//! adapter only covers outbound calls.

mod mock_payment_provider;
mod stripe_adapter;

pub use mock_payment_provider::MockPaymentProvider;
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
