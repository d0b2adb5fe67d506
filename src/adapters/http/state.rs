//! Shared application state for the billing HTTP API.
//!
//! Holds the ports every route needs and builds a fresh command or query
//! handler per request.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use secrecy::SecretString;

use crate::adapters::http::origin::ClientIpSource;
use crate::application::handlers::billing::{
    CheckBillingAccessHandler, CheckTenantStatusHandler, CheckoutSettings,
    ClaimLicenseKeyHandler, CreatePortalSessionHandler, GenerateLicenseKeysHandler,
    GetBillingStatusHandler, GetTenantDetailHandler, GrantEntitlementHandler,
    HandleStripeWebhookHandler, ListAuditLogsHandler, ListLicenseKeysHandler, ListTenantsHandler,
    ReconciliationSettings, RevokeEntitlementHandler, RevokeLicenseKeyHandler, SubscribeHandler,
    UpdateTenantStatusHandler,
};
use crate::domain::billing::SignatureVerifier;
use crate::ports::{
    AdminIdentityVerifier, AdminRepository, BillingAuditLogRepository, EntitlementRepository,
    LicenseKeyRepository, PasswordHasher, PaymentProvider, RateLimiter, SubscriptionRepository,
    TenantRepository, TenantSessionValidator, TransactionManager, WebhookEventRepository,
};

/// Non-port settings used by the HTTP layer and its handlers.
#[derive(Debug, Clone)]
pub struct BillingHttpSettings {
    /// `None` soft-disables the Stripe webhook endpoint.
    pub webhook_secret: Option<SecretString>,
    pub signature_verifier: SignatureVerifier,
    pub reconciliation: ReconciliationSettings,
    pub checkout: CheckoutSettings,
    pub portal_return_url: String,
    /// Fixed delay before answering a rate limited or failed public request.
    pub failure_delay: Duration,
    /// Source of the client address for rate limit keys and audit entries.
    pub client_ip_source: ClientIpSource,
}

impl Default for BillingHttpSettings {
    fn default() -> Self {
        let reconciliation = ReconciliationSettings::default();
        Self {
            webhook_secret: None,
            signature_verifier: SignatureVerifier::new(),
            checkout: CheckoutSettings {
                success_url: String::new(),
                cancel_url: String::new(),
                plan_code: reconciliation.default_plan_code.clone(),
            },
            reconciliation,
            portal_return_url: String::new(),
            failure_delay: Duration::from_secs(1),
            client_ip_source: ClientIpSource::PeerAddress,
        }
    }
}

/// Services that are not backed by the billing store.
#[derive(Clone)]
pub struct BillingServices {
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub tenant_sessions: Arc<dyn TenantSessionValidator>,
    pub admin_identity: Arc<dyn AdminIdentityVerifier>,
    pub claim_limiter: Arc<dyn RateLimiter>,
    pub subscribe_limiter: Arc<dyn RateLimiter>,
}

/// Application state shared by all billing routes.
#[derive(Clone)]
pub struct BillingAppState {
    pub tenants: Arc<dyn TenantRepository>,
    pub entitlements: Arc<dyn EntitlementRepository>,
    pub license_keys: Arc<dyn LicenseKeyRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub audit_logs: Arc<dyn BillingAuditLogRepository>,
    pub admins: Arc<dyn AdminRepository>,
    pub transactions: Arc<dyn TransactionManager>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub tenant_sessions: Arc<dyn TenantSessionValidator>,
    pub admin_identity: Arc<dyn AdminIdentityVerifier>,
    pub claim_limiter: Arc<dyn RateLimiter>,
    pub subscribe_limiter: Arc<dyn RateLimiter>,
    pub settings: Arc<BillingHttpSettings>,
}

impl BillingAppState {
    /// Wires every repository port to one store implementation.
    pub fn from_store<S>(store: S, services: BillingServices, settings: BillingHttpSettings) -> Self
    where
        S: TenantRepository
            + EntitlementRepository
            + LicenseKeyRepository
            + SubscriptionRepository
            + WebhookEventRepository
            + BillingAuditLogRepository
            + AdminRepository
            + TransactionManager
            + 'static,
    {
        let store = Arc::new(store);
        Self {
            tenants: store.clone(),
            entitlements: store.clone(),
            license_keys: store.clone(),
            subscriptions: store.clone(),
            webhook_events: store.clone(),
            audit_logs: store.clone(),
            admins: store.clone(),
            transactions: store,
            payment_provider: services.payment_provider,
            password_hasher: services.password_hasher,
            tenant_sessions: services.tenant_sessions,
            admin_identity: services.admin_identity,
            claim_limiter: services.claim_limiter,
            subscribe_limiter: services.subscribe_limiter,
            settings: Arc::new(settings),
        }
    }

    // ─── public ────────────────────────────────────────────────────

    pub fn stripe_webhook_handler(&self) -> HandleStripeWebhookHandler {
        HandleStripeWebhookHandler::new(
            self.webhook_events.clone(),
            self.transactions.clone(),
            self.settings.reconciliation.clone(),
        )
    }

    pub fn claim_license_key_handler(&self) -> ClaimLicenseKeyHandler {
        ClaimLicenseKeyHandler::new(
            self.license_keys.clone(),
            self.transactions.clone(),
            self.password_hasher.clone(),
            self.settings.reconciliation.default_plan_code.clone(),
        )
        .with_delay(self.settings.failure_delay)
    }

    pub fn subscribe_handler(&self) -> SubscribeHandler {
        SubscribeHandler::new(
            self.transactions.clone(),
            self.payment_provider.clone(),
            self.password_hasher.clone(),
            self.settings.checkout.clone(),
        )
    }

    // ─── tenant ────────────────────────────────────────────────────

    pub fn tenant_status_gate(&self) -> CheckTenantStatusHandler {
        CheckTenantStatusHandler::new(self.tenants.clone())
    }

    pub fn billing_guard(&self) -> CheckBillingAccessHandler {
        CheckBillingAccessHandler::new(self.tenants.clone(), self.entitlements.clone())
    }

    pub fn billing_status_handler(&self) -> GetBillingStatusHandler {
        GetBillingStatusHandler::new(
            self.tenants.clone(),
            self.entitlements.clone(),
            self.subscriptions.clone(),
        )
    }

    pub fn portal_session_handler(&self) -> CreatePortalSessionHandler {
        CreatePortalSessionHandler::new(
            self.subscriptions.clone(),
            self.payment_provider.clone(),
            self.settings.portal_return_url.clone(),
        )
    }

    // ─── admin ─────────────────────────────────────────────────────

    pub fn generate_license_keys_handler(&self) -> GenerateLicenseKeysHandler {
        GenerateLicenseKeysHandler::new(self.transactions.clone())
    }

    pub fn list_license_keys_handler(&self) -> ListLicenseKeysHandler {
        ListLicenseKeysHandler::new(self.license_keys.clone())
    }

    pub fn revoke_license_key_handler(&self) -> RevokeLicenseKeyHandler {
        RevokeLicenseKeyHandler::new(self.transactions.clone())
    }

    pub fn list_tenants_handler(&self) -> ListTenantsHandler {
        ListTenantsHandler::new(self.tenants.clone())
    }

    pub fn tenant_detail_handler(&self) -> GetTenantDetailHandler {
        GetTenantDetailHandler::new(
            self.tenants.clone(),
            self.entitlements.clone(),
            self.subscriptions.clone(),
            self.admins.clone(),
        )
    }

    pub fn update_tenant_status_handler(&self) -> UpdateTenantStatusHandler {
        UpdateTenantStatusHandler::new(
            self.transactions.clone(),
            self.settings.reconciliation.grace_period_days,
        )
    }

    pub fn grant_entitlement_handler(&self) -> GrantEntitlementHandler {
        GrantEntitlementHandler::new(self.transactions.clone())
    }

    pub fn revoke_entitlement_handler(&self) -> RevokeEntitlementHandler {
        RevokeEntitlementHandler::new(self.transactions.clone())
    }

    pub fn list_audit_logs_handler(&self) -> ListAuditLogsHandler {
        ListAuditLogsHandler::new(self.audit_logs.clone())
    }
}

impl FromRef<BillingAppState> for ClientIpSource {
    fn from_ref(state: &BillingAppState) -> Self {
        state.settings.client_ip_source.clone()
    }
}
