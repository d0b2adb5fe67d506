//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid listen address")]
    InvalidListenAddress,

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid Stripe API key format")]
    InvalidStripeKey,

    #[error("Invalid Stripe webhook secret format")]
    InvalidStripeWebhookSecret,

    #[error("Checkout and portal URLs must be absolute http(s) URLs")]
    InvalidRedirectUrl,

    #[error("Tenant JWT secret must be at least {0} bytes")]
    JwtSecretTooShort(usize),

    #[error("Cloudflare Access team domain and audience must be set together")]
    IncompleteAccessConfig,

    #[error("Cloudflare Access is required in production")]
    AccessRequiredInProduction,

    #[error("Grace period must be between 1 and 90 days")]
    InvalidGracePeriod,

    #[error("Public rate limit and window must be positive")]
    InvalidRateLimit,

    #[error("Plan code must not be empty")]
    EmptyPlanCode,
}
