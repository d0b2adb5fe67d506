//! Authentication adapters.
//!
//! Implementations of the `TenantSessionValidator` and
//! `AdminIdentityVerifier` ports:
//!
//! - `tenant_jwt` - HS256 tenant session tokens
//! - `access_jwt` - Cloudflare Access assertions for platform admins, plus
//!   the sentinel verifier used when Access is not configured

mod access_jwt;
mod tenant_jwt;

pub use access_jwt::{CloudflareAccessConfig, CloudflareAccessVerifier, SystemAdminVerifier};
pub use tenant_jwt::{TenantJwtCodec, DEFAULT_TOKEN_TTL_SECS, TOKEN_ISSUER};
