//! Cloudflare Access adapter for the admin trust boundary.
//!
//! Admin routes sit behind Cloudflare Access, which forwards a signed
//! assertion in `Cf-Access-Jwt-Assertion`. This adapter validates it by:
//!
//! 1. Fetching the team's signing keys from `/cdn-cgi/access/certs`
//! 2. Validating the RS256 signature against the matching `kid`
//! 3. Validating issuer, audience and expiry claims
//! 4. Resolving the actor id from `email`, falling back to `sub`
//!
//! When Access is not configured, `SystemAdminVerifier` resolves every
//! request to a fixed sentinel actor. Configuration validation refuses that
//! combination in production.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::ports::{AdminActor, AdminIdentityVerifier, AuthError};

const DEFAULT_JWKS_CACHE: Duration = Duration::from_secs(3600);

/// Configuration for Cloudflare Access verification.
#[derive(Debug, Clone)]
pub struct CloudflareAccessConfig {
    /// Team domain, e.g. `vrcshift.cloudflareaccess.com`.
    pub team_domain: String,

    /// Application audience tag (`aud`).
    pub audience: String,

    /// How long signing keys are cached. Defaults to one hour.
    pub jwks_cache_duration: Option<Duration>,
}

impl CloudflareAccessConfig {
    pub fn new(team_domain: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            team_domain: team_domain.into(),
            audience: audience.into(),
            jwks_cache_duration: None,
        }
    }

    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.jwks_cache_duration = Some(duration);
        self
    }

    fn base_url(&self) -> String {
        let domain = self
            .team_domain
            .trim_start_matches("https://")
            .trim_end_matches('/');
        format!("https://{}", domain)
    }

    fn issuer(&self) -> String {
        self.base_url()
    }

    fn jwks_url(&self) -> String {
        format!("{}/cdn-cgi/access/certs", self.base_url())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    exp: i64,
}

/// Cached signing keys with expiry tracking.
struct JwksCache {
    jwks: JwkSet,
    fetched_at: Instant,
    cache_duration: Duration,
}

impl JwksCache {
    fn new(jwks: JwkSet, cache_duration: Duration) -> Self {
        Self {
            jwks,
            fetched_at: Instant::now(),
            cache_duration,
        }
    }

    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > self.cache_duration
    }
}

/// Verifies Cloudflare Access assertions.
///
/// Keys are fetched lazily on first verification and refreshed once the
/// cache expires.
pub struct CloudflareAccessVerifier {
    config: CloudflareAccessConfig,
    http_client: reqwest::Client,
    jwks_cache: Arc<RwLock<Option<JwksCache>>>,
}

impl CloudflareAccessVerifier {
    pub fn new(config: CloudflareAccessConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            config,
            http_client,
            jwks_cache: Arc::new(RwLock::new(None)),
        }
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let url = self.config.jwks_url();
        tracing::debug!(url = %url, "Fetching Cloudflare Access certs");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch Access certs");
            AuthError::ServiceUnavailable(format!("failed to fetch certs: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(%status, "Access certs endpoint returned error");
            return Err(AuthError::ServiceUnavailable(format!(
                "certs endpoint returned {}",
                status
            )));
        }

        response.json::<JwkSet>().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Access certs");
            AuthError::ServiceUnavailable(format!("failed to parse certs: {}", e))
        })
    }

    async fn get_jwks(&self) -> Result<JwkSet, AuthError> {
        {
            let cache = self.jwks_cache.read().await;
            if let Some(ref cached) = *cache {
                if !cached.is_expired() {
                    return Ok(cached.jwks.clone());
                }
            }
        }

        let jwks = self.fetch_jwks().await?;

        {
            let mut cache = self.jwks_cache.write().await;
            let duration = self.config.jwks_cache_duration.unwrap_or(DEFAULT_JWKS_CACHE);
            *cache = Some(JwksCache::new(jwks.clone(), duration));
        }

        Ok(jwks)
    }

    fn decoding_key(
        header: &jsonwebtoken::Header,
        jwks: &JwkSet,
    ) -> Result<DecodingKey, AuthError> {
        let kid = header.kid.as_ref().ok_or_else(|| {
            tracing::warn!("Access assertion missing 'kid' header");
            AuthError::InvalidToken
        })?;
        let jwk = jwks.find(kid).ok_or_else(|| {
            tracing::warn!(kid = %kid, "No Access signing key for kid");
            AuthError::InvalidToken
        })?;
        DecodingKey::from_jwk(jwk).map_err(|e| {
            tracing::warn!(error = %e, "Unusable Access signing key");
            AuthError::InvalidToken
        })
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.config.issuer()]);
        validation.set_audience(&[&self.config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation
    }
}

#[async_trait]
impl AdminIdentityVerifier for CloudflareAccessVerifier {
    async fn verify(&self, assertion: Option<&str>) -> Result<AdminActor, AuthError> {
        let token = assertion
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredentials)?;

        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "Malformed Access assertion header");
            AuthError::InvalidToken
        })?;
        if header.alg != Algorithm::RS256 {
            tracing::warn!(alg = ?header.alg, "Unexpected Access assertion algorithm");
            return Err(AuthError::InvalidToken);
        }

        let jwks = self.get_jwks().await?;
        let key = Self::decoding_key(&header, &jwks)?;

        let claims = decode::<AccessClaims>(token, &key, &self.validation())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::warn!(error = %e, "Access assertion rejected");
                    AuthError::InvalidToken
                }
            })?
            .claims;

        let id = claims
            .email
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(claims.sub);
        Ok(AdminActor { id })
    }
}

impl std::fmt::Debug for CloudflareAccessVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareAccessVerifier")
            .field("team_domain", &self.config.team_domain)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}

/// Resolves every admin request to one sentinel actor.
///
/// Used when Cloudflare Access is not configured outside production.
#[derive(Debug, Clone)]
pub struct SystemAdminVerifier {
    actor_id: String,
}

impl SystemAdminVerifier {
    pub fn new(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
        }
    }
}

#[async_trait]
impl AdminIdentityVerifier for SystemAdminVerifier {
    async fn verify(&self, _assertion: Option<&str>) -> Result<AdminActor, AuthError> {
        Ok(AdminActor {
            id: self.actor_id.clone(),
        })
    }
}
