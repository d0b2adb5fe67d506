//! Entitlements: grants of product access to a tenant.
//!
//! Entitlements are never deleted. Revocation stamps `revoked_at`, and a tenant
//! is entitled while at least one of its entitlements is unrevoked.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EntitlementId, TenantId, Timestamp, ValidationError};

use super::errors::BillingError;

/// Where an entitlement came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementSource {
    LicenseKey,
    Subscription,
    AdminGrant,
}

impl EntitlementSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementSource::LicenseKey => "license_key",
            EntitlementSource::Subscription => "subscription",
            EntitlementSource::AdminGrant => "admin_grant",
        }
    }
}

impl fmt::Display for EntitlementSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntitlementSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "license_key" => Ok(EntitlementSource::LicenseKey),
            "subscription" => Ok(EntitlementSource::Subscription),
            "admin_grant" => Ok(EntitlementSource::AdminGrant),
            other => Err(ValidationError::invalid_format(
                "source",
                format!("unknown entitlement source '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: EntitlementId,
    pub tenant_id: TenantId,
    pub plan_code: String,
    pub source: EntitlementSource,
    pub starts_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
}

impl Entitlement {
    /// Grants a new, unrevoked entitlement starting at `now`.
    pub fn grant(
        tenant_id: TenantId,
        plan_code: impl Into<String>,
        source: EntitlementSource,
        now: Timestamp,
    ) -> Result<Self, BillingError> {
        let plan_code = plan_code.into().trim().to_string();
        if plan_code.is_empty() {
            return Err(BillingError::validation("plan_code", "cannot be empty"));
        }
        Ok(Self {
            id: EntitlementId::new(),
            tenant_id,
            plan_code,
            source,
            starts_at: now,
            revoked_at: None,
        })
    }

    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Stamps the revocation time. Revoking twice is a conflict.
    pub fn revoke(&mut self, now: Timestamp) -> Result<(), BillingError> {
        if self.is_revoked() {
            return Err(BillingError::EntitlementAlreadyRevoked);
        }
        self.revoked_at = Some(now);
        Ok(())
    }
}

/// True when at least one entitlement is unrevoked.
pub fn is_entitled(entitlements: &[Entitlement]) -> bool {
    entitlements.iter().any(Entitlement::is_active)
}
