//! HS256 tenant session tokens.
//!
//! Tokens carry the tenant and admin ids and are checked for signature,
//! issuer and expiry. Issuance lives here too so tests and tooling share
//! one claim layout.

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AdminId, TenantId, Timestamp};
use crate::ports::{AuthError, TenantContext, TenantSessionValidator};

pub const TOKEN_ISSUER: &str = "vrcshift";

/// Default lifetime of issued tokens.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60 * 12;

#[derive(Debug, Serialize, Deserialize)]
struct TenantClaims {
    /// Admin id.
    sub: String,
    tenant_id: String,
    iss: String,
    iat: i64,
    exp: i64,
}

pub struct TenantJwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl TenantJwtCodec {
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }

    pub fn with_ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Issues a token valid from `now` for the configured lifetime.
    pub fn issue(&self, context: TenantContext, now: Timestamp) -> Result<String, AuthError> {
        let iat = now.as_unix_secs();
        let claims = TenantClaims {
            sub: context.admin_id.to_string(),
            tenant_id: context.tenant_id.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            iat,
            exp: iat + self.ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign tenant token");
            AuthError::ServiceUnavailable("token signing failed".to_string())
        })
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation
    }
}

#[async_trait]
impl TenantSessionValidator for TenantJwtCodec {
    async fn validate(&self, token: &str) -> Result<TenantContext, AuthError> {
        let claims = decode::<TenantClaims>(token, &self.decoding, &Self::validation())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::debug!(error = %e, "Tenant token rejected");
                    AuthError::InvalidToken
                }
            })?
            .claims;

        let tenant_id: TenantId = claims.tenant_id.parse().map_err(|_| AuthError::InvalidToken)?;
        let admin_id: AdminId = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        Ok(TenantContext {
            tenant_id,
            admin_id,
        })
    }
}

impl std::fmt::Debug for TenantJwtCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantJwtCodec")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
