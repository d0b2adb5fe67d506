//! ClaimLicenseKeyHandler - public, unauthenticated license key redemption.
//!
//! Validation runs before any transaction is opened. The transaction then
//! claims the key conditionally and creates tenant, owner admin and
//! entitlement together, so either the whole bundle exists or none of it.
//!
//! Every call sleeps for the same fixed delay first, whatever the outcome.
//! Precise failure causes are logged; the HTTP layer hides them.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use crate::domain::billing::{
    actions, is_well_formed, key_digest, targets, validate_display_name, validate_email,
    validate_password, ActorType, Admin, BillingAuditLog, BillingError, Entitlement,
    EntitlementSource, RequestOrigin, Tenant,
};
use crate::domain::foundation::{AdminId, EntitlementId, TenantId, Timestamp};
use crate::ports::{LicenseKeyRepository, PasswordHasher, TransactionManager};

use super::license_key_snapshot;

/// Default delay applied before every claim response.
pub const DEFAULT_CLAIM_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ClaimLicenseKeyCommand {
    pub license_key: SecretString,
    pub email: String,
    pub password: SecretString,
    pub display_name: String,
    pub tenant_name: String,
    pub origin: RequestOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimLicenseKeyResult {
    pub tenant_id: TenantId,
    pub admin_id: AdminId,
    pub tenant_name: String,
    pub entitlement_id: EntitlementId,
}

pub struct ClaimLicenseKeyHandler {
    license_keys: Arc<dyn LicenseKeyRepository>,
    transactions: Arc<dyn TransactionManager>,
    password_hasher: Arc<dyn PasswordHasher>,
    plan_code: String,
    delay: Duration,
}

impl ClaimLicenseKeyHandler {
    pub fn new(
        license_keys: Arc<dyn LicenseKeyRepository>,
        transactions: Arc<dyn TransactionManager>,
        password_hasher: Arc<dyn PasswordHasher>,
        plan_code: impl Into<String>,
    ) -> Self {
        Self {
            license_keys,
            transactions,
            password_hasher,
            plan_code: plan_code.into(),
            delay: DEFAULT_CLAIM_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn handle(
        &self,
        cmd: ClaimLicenseKeyCommand,
    ) -> Result<ClaimLicenseKeyResult, BillingError> {
        tokio::time::sleep(self.delay).await;

        let result = self.claim(cmd).await;
        if let Err(err) = &result {
            tracing::warn!(code = err.code(), error = %err, "License key claim rejected");
        }
        result
    }

    async fn claim(
        &self,
        cmd: ClaimLicenseKeyCommand,
    ) -> Result<ClaimLicenseKeyResult, BillingError> {
        let now = Timestamp::now();

        // 1. Locate the key by digest; malformed input never reaches storage
        if !is_well_formed(cmd.license_key.expose_secret()) {
            return Err(BillingError::LicenseKeyNotFound);
        }
        let key = self
            .license_keys
            .find_by_hash(&key_digest(&cmd.license_key))
            .await?
            .ok_or(BillingError::LicenseKeyNotFound)?;
        key.ensure_claimable(now)?;

        // 2. Validate claimant inputs
        let email = validate_email(&cmd.email)?;
        validate_password(cmd.password.expose_secret())?;
        let display_name = validate_display_name(&cmd.display_name)?;

        // 3. Build the bundle
        let tenant = Tenant::new_active(cmd.tenant_name.as_str(), now)?;
        let password_hash = self.password_hasher.hash(&cmd.password).await?;
        let admin = Admin::new_owner(tenant.id(), &email, &display_name, password_hash, now)?;
        let entitlement = Entitlement::grant(
            tenant.id(),
            self.plan_code.as_str(),
            EntitlementSource::LicenseKey,
            now,
        )?;

        // 4. Claim and persist atomically
        let mut tx = self.transactions.begin().await?;
        if !tx.claim_license_key(key.id, tenant.id(), now).await? {
            return Err(BillingError::LicenseKeyAlreadyClaimed);
        }
        tx.insert_tenant(&tenant).await?;
        tx.insert_admin(&admin).await?;
        tx.insert_entitlement(&entitlement).await?;

        let mut claimed = key.clone();
        claimed.claim(tenant.id(), now)?;
        let entry = BillingAuditLog::builder(ActorType::Admin, actions::LICENSE_KEY_CLAIMED)
            .actor(admin.id.to_string())
            .target(targets::LICENSE_KEY, key.id)
            .before(license_key_snapshot(&key))
            .after(json!({
                "status": claimed.status.as_str(),
                "claimed_by": tenant.id().to_string(),
                "entitlement_id": entitlement.id.to_string(),
            }))
            .origin(&cmd.origin)
            .build(now);
        tx.append_audit_log(&entry).await?;
        tx.commit().await?;

        tracing::info!(
            key_id = %key.id,
            tenant_id = %tenant.id(),
            admin_id = %admin.id,
            "License key claimed"
        );

        Ok(ClaimLicenseKeyResult {
            tenant_id: tenant.id(),
            admin_id: admin.id,
            tenant_name: tenant.name().to_string(),
            entitlement_id: entitlement.id,
        })
    }
}
