//! Admin HTTP module - license keys, tenants, entitlements and the audit
//! trail, behind the Cloudflare Access trust boundary.

mod dto;
mod handlers;
mod routes;

pub use dto::*;
pub use routes::admin_routes;
