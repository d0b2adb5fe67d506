//! VRCShift billing server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use vrcshift_billing::adapters::auth::{
    CloudflareAccessConfig, CloudflareAccessVerifier, SystemAdminVerifier, TenantJwtCodec,
};
use vrcshift_billing::adapters::http::{
    api_router, BillingAppState, BillingHttpSettings, BillingServices, ClientIpSource,
};
use vrcshift_billing::adapters::password::Argon2PasswordHasher;
use vrcshift_billing::adapters::postgres::{self, PostgresBillingStore};
use vrcshift_billing::adapters::rate_limiter::{
    PublicEndpointPolicies, RateLimitPolicy, SlidingWindowRateLimiter, COMPACTION_INTERVAL,
};
use vrcshift_billing::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use vrcshift_billing::application::handlers::billing::{CheckoutSettings, ReconciliationSettings};
use vrcshift_billing::config::{AppConfig, ServerConfig};
use vrcshift_billing::domain::billing::SignatureVerifier;
use vrcshift_billing::ports::{AdminIdentityVerifier, RateLimiter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        stripe_test_mode = config.payment.is_test_mode(),
        "Starting VRCShift billing server"
    );

    // Database
    let pool = postgres::connect(
        &config.database.url,
        config.database.max_connections,
        config.database.acquire_timeout(),
    )
    .await?;
    if config.database.run_migrations {
        postgres::run_migrations(&pool).await?;
    }
    let store = PostgresBillingStore::new(pool);

    // Trust boundaries
    let tenant_sessions = Arc::new(TenantJwtCodec::new(&config.auth.tenant_jwt_secret));
    let admin_identity: Arc<dyn AdminIdentityVerifier> = match config.auth.access() {
        Some((team_domain, audience)) => Arc::new(CloudflareAccessVerifier::new(
            CloudflareAccessConfig::new(team_domain, audience)
                .with_cache_duration(config.auth.jwks_cache_ttl()),
        )),
        None => {
            tracing::warn!(
                actor_id = %config.auth.system_admin_id,
                "Cloudflare Access not configured; admin API uses the system admin sentinel"
            );
            Arc::new(SystemAdminVerifier::new(config.auth.system_admin_id.clone()))
        }
    };

    // Stripe
    let payment_provider = Arc::new(StripePaymentAdapter::new(
        StripeConfig::new(
            config.payment.stripe_api_key.clone(),
            config.payment.stripe_price_id.clone(),
        )
        .with_base_url(config.payment.api_base_url.clone()),
    ));
    let webhook_secret = config.payment.webhook_secret().cloned();
    if webhook_secret.is_none() {
        tracing::warn!("Stripe webhook secret not configured; webhook deliveries will be ignored");
    }

    // Public endpoint limiters
    let policies = PublicEndpointPolicies::uniform(RateLimitPolicy::new(
        config.billing.public_rate_limit,
        config.billing.public_rate_window_secs,
    ));
    let claim_limiter = Arc::new(SlidingWindowRateLimiter::from_policy(policies.license_claim));
    let subscribe_limiter = Arc::new(SlidingWindowRateLimiter::from_policy(policies.subscribe));
    claim_limiter.spawn_compaction(COMPACTION_INTERVAL);
    subscribe_limiter.spawn_compaction(COMPACTION_INTERVAL);

    let client_ip_source = ClientIpSource::from_header(config.server.client_ip_header())?;
    if client_ip_source == ClientIpSource::PeerAddress {
        tracing::info!("Rate limiting public endpoints by socket peer address");
    }

    let settings = BillingHttpSettings {
        webhook_secret,
        signature_verifier: SignatureVerifier::new(),
        reconciliation: ReconciliationSettings {
            grace_period_days: config.billing.grace_period_days,
            default_plan_code: config.billing.default_plan_code.clone(),
        },
        checkout: CheckoutSettings {
            success_url: config.payment.checkout_success_url.clone(),
            cancel_url: config.payment.checkout_cancel_url.clone(),
            plan_code: config.billing.default_plan_code.clone(),
        },
        portal_return_url: config.payment.portal_return_url.clone(),
        failure_delay: config.billing.failure_delay(),
        client_ip_source,
    };

    let services = BillingServices {
        payment_provider,
        password_hasher: Arc::new(Argon2PasswordHasher::new()),
        tenant_sessions,
        admin_identity,
        claim_limiter: claim_limiter as Arc<dyn RateLimiter>,
        subscribe_limiter: subscribe_limiter as Arc<dyn RateLimiter>,
    };

    let state = BillingAppState::from_store(store, services, settings);
    let app = api_router(state, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG` overrides
/// the configured level.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(server.log_level.as_str()));

    if server.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
