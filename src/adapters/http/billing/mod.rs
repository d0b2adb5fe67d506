//! Billing HTTP module - Stripe webhook, public claim/subscribe and
//! tenant-facing billing endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::*;
pub use handlers::STRIPE_SIGNATURE_HEADER;
pub use routes::{public_routes, tenant_billing_routes, tenant_routes, webhook_routes};
