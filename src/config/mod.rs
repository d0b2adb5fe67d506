//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables use the `VRCSHIFT` prefix and
//! nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use vrcshift_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod billing;
mod database;
mod error;
mod payment;
mod server;

pub use auth::{AuthConfig, MIN_JWT_SECRET_LEN};
pub use billing::BillingConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment configuration (Stripe)
    pub payment: PaymentConfig,

    /// Tenant tokens and the admin trust boundary
    pub auth: AuthConfig,

    /// Grace period, plan and public endpoint throttling
    #[serde(default)]
    pub billing: BillingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `VRCSHIFT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// - `VRCSHIFT__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `VRCSHIFT__BILLING__GRACE_PERIOD_DAYS=7` -> `billing.grace_period_days = 7`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("VRCSHIFT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.billing.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[(&str, &str)] = &[
        ("VRCSHIFT__DATABASE__URL", "postgresql://test@localhost/test"),
        ("VRCSHIFT__PAYMENT__STRIPE_API_KEY", "sk_test_xxx"),
        ("VRCSHIFT__PAYMENT__STRIPE_WEBHOOK_SECRET", "whsec_xxx"),
        ("VRCSHIFT__PAYMENT__STRIPE_PRICE_ID", "price_123"),
        ("VRCSHIFT__PAYMENT__CHECKOUT_SUCCESS_URL", "https://app.example.com/ok"),
        ("VRCSHIFT__PAYMENT__CHECKOUT_CANCEL_URL", "https://app.example.com/cancel"),
        ("VRCSHIFT__PAYMENT__PORTAL_RETURN_URL", "https://app.example.com/settings"),
        (
            "VRCSHIFT__AUTH__TENANT_JWT_SECRET",
            "0123456789abcdef0123456789abcdef",
        ),
    ];

    const OPTIONAL: &[&str] = &[
        "VRCSHIFT__SERVER__PORT",
        "VRCSHIFT__SERVER__ENVIRONMENT",
        "VRCSHIFT__BILLING__GRACE_PERIOD_DAYS",
        "VRCSHIFT__AUTH__ACCESS_TEAM_DOMAIN",
        "VRCSHIFT__AUTH__ACCESS_AUDIENCE",
    ];

    fn set_minimal_env() {
        for (key, value) in VARS {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in VARS {
            env::remove_var(key);
        }
        for key in OPTIONAL {
            env::remove_var(key);
        }
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        set_minimal_env();
        for (key, value) in extra {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_load_from_environment() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.payment.stripe_price_id, "price_123");
        assert!(config.payment.webhook_secret().is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_applied() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.billing.grace_period_days, 14);
        assert_eq!(config.auth.system_admin_id, "system-admin");
    }

    #[test]
    fn test_overrides() {
        let config = load_with(&[
            ("VRCSHIFT__SERVER__PORT", "3000"),
            ("VRCSHIFT__BILLING__GRACE_PERIOD_DAYS", "7"),
        ])
        .unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.billing.grace_period_days, 7);
    }

    #[test]
    fn test_production_requires_access() {
        let config = load_with(&[("VRCSHIFT__SERVER__ENVIRONMENT", "production")]).unwrap();
        assert!(config.is_production());
        assert_eq!(
            config.validate(),
            Err(ValidationError::AccessRequiredInProduction)
        );

        let config = load_with(&[
            ("VRCSHIFT__SERVER__ENVIRONMENT", "production"),
            ("VRCSHIFT__AUTH__ACCESS_TEAM_DOMAIN", "team.cloudflareaccess.com"),
            ("VRCSHIFT__AUTH__ACCESS_AUDIENCE", "aud-tag"),
        ])
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_required_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        assert!(AppConfig::load().is_err());
    }
}
