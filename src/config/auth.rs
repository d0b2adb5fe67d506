//! Authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Authentication configuration
///
/// Tenant sessions are HS256 tokens signed with `tenant_jwt_secret`. Platform
/// admins come through Cloudflare Access when `access_team_domain` and
/// `access_audience` are set; otherwise every admin request acts as
/// `system_admin_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub tenant_jwt_secret: SecretString,

    /// Cloudflare Access team domain
    #[serde(default)]
    pub access_team_domain: Option<String>,

    /// Cloudflare Access application audience tag
    #[serde(default)]
    pub access_audience: Option<String>,

    /// JWKS cache TTL in seconds
    #[serde(default = "default_jwks_cache_ttl")]
    pub jwks_cache_ttl_secs: u64,

    #[serde(default = "default_system_admin_id")]
    pub system_admin_id: String,
}

impl AuthConfig {
    /// Get JWKS cache TTL as Duration
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_secs)
    }

    /// Team domain and audience, when Cloudflare Access is configured.
    pub fn access(&self) -> Option<(&str, &str)> {
        let domain = self.access_team_domain.as_deref().filter(|s| !s.is_empty())?;
        let audience = self.access_audience.as_deref().filter(|s| !s.is_empty())?;
        Some((domain, audience))
    }

    /// Validate authentication configuration
    ///
    /// Production requires Cloudflare Access.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.tenant_jwt_secret.expose_secret().len() < MIN_JWT_SECRET_LEN {
            return Err(ValidationError::JwtSecretTooShort(MIN_JWT_SECRET_LEN));
        }

        let domain_set = self.access_team_domain.as_deref().map_or(false, |s| !s.is_empty());
        let audience_set = self.access_audience.as_deref().map_or(false, |s| !s.is_empty());
        if domain_set != audience_set {
            return Err(ValidationError::IncompleteAccessConfig);
        }

        if *environment == Environment::Production && self.access().is_none() {
            return Err(ValidationError::AccessRequiredInProduction);
        }

        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tenant_jwt_secret: SecretString::new(String::new()),
            access_team_domain: None,
            access_audience: None,
            jwks_cache_ttl_secs: default_jwks_cache_ttl(),
            system_admin_id: default_system_admin_id(),
        }
    }
}

fn default_jwks_cache_ttl() -> u64 {
    3600
}

fn default_system_admin_id() -> String {
    "system-admin".to_string()
}
