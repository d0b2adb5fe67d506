//! Authentication ports.
//!
//! Two trust boundaries exist:
//!
//! - Tenant routes carry a tenant session token (`Authorization: Bearer`).
//! - Admin routes sit behind Cloudflare Access, which forwards a signed
//!   assertion in `Cf-Access-Jwt-Assertion`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AdminId, TenantId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("identity provider unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Identity resolved from a tenant session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub admin_id: AdminId,
}

/// Validates tenant session tokens.
#[async_trait]
pub trait TenantSessionValidator: Send + Sync {
    /// `token` is the raw JWT without the `Bearer ` prefix.
    async fn validate(&self, token: &str) -> Result<TenantContext, AuthError>;
}

/// Platform operator resolved at the admin trust boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminActor {
    /// Recorded as `actor_id` in the audit trail.
    pub id: String,
}

/// Resolves the acting platform admin for `/api/v1/admin` requests.
#[async_trait]
pub trait AdminIdentityVerifier: Send + Sync {
    /// `assertion` is the `Cf-Access-Jwt-Assertion` header, if present.
    async fn verify(&self, assertion: Option<&str>) -> Result<AdminActor, AuthError>;
}
