//! HTTP adapters - the billing REST API.
//!
//! - `billing` - Stripe webhook, public claim/subscribe, tenant billing
//! - `admin` - platform admin operations behind Cloudflare Access
//! - `middleware` - authentication, billing gates, rate limiting
//! - `error` - mapping of billing errors to responses

pub mod admin;
pub mod billing;
pub mod error;
pub mod middleware;
pub mod origin;
pub mod router;
pub mod state;

pub use error::{ApiError, PublicApiError};
pub use origin::ClientIpSource;
pub use router::{api_router, protect_tenant_routes, DEFAULT_REQUEST_TIMEOUT};
pub use state::{BillingAppState, BillingHttpSettings, BillingServices};
