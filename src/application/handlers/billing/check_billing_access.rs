//! Access gates consulted by the HTTP middleware.
//!
//! - `CheckTenantStatusHandler` backs the strict tenant status gate that
//!   rejects every request of a suspended tenant.
//! - `CheckBillingAccessHandler` backs the billing guard: revoked
//!   entitlements block everything, otherwise the tenant status decides per
//!   operation kind.

use std::sync::Arc;

use crate::domain::billing::{BillingAccessPolicy, BillingError, OperationKind, TenantStatus};
use crate::domain::foundation::{ErrorCode, TenantId};
use crate::ports::{EntitlementRepository, TenantRepository};

pub struct CheckTenantStatusHandler {
    tenants: Arc<dyn TenantRepository>,
}

impl CheckTenantStatusHandler {
    pub fn new(tenants: Arc<dyn TenantRepository>) -> Self {
        Self { tenants }
    }

    /// An unknown tenant passes; the route decides how to answer it.
    pub async fn handle(&self, tenant_id: TenantId) -> Result<(), BillingError> {
        match self.tenants.find_by_id(tenant_id).await? {
            Some(tenant) => BillingAccessPolicy::check_tenant_status_gate(tenant.status()),
            None => Ok(()),
        }
    }
}

pub struct CheckBillingAccessHandler {
    tenants: Arc<dyn TenantRepository>,
    entitlements: Arc<dyn EntitlementRepository>,
}

impl CheckBillingAccessHandler {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        entitlements: Arc<dyn EntitlementRepository>,
    ) -> Self {
        Self {
            tenants,
            entitlements,
        }
    }

    /// Returns the resolved status when a tenant was checked.
    ///
    /// `None` means there was nothing to check: no tenant in context yet, or
    /// a tenant that does not exist.
    pub async fn handle(
        &self,
        tenant_id: Option<TenantId>,
        operation: OperationKind,
    ) -> Result<Option<TenantStatus>, BillingError> {
        let Some(tenant_id) = tenant_id else {
            return Ok(None);
        };

        let revoked = self.entitlements.has_revoked(tenant_id).await.map_err(|err| {
            tracing::error!(tenant_id = %tenant_id, error = %err, "Entitlement lookup failed");
            BillingError::infrastructure(err.to_string())
        })?;
        BillingAccessPolicy::check_revocation(revoked)?;

        let tenant = match self.tenants.find_by_id(tenant_id).await {
            Ok(Some(tenant)) => tenant,
            Ok(None) => return Ok(None),
            Err(err) if err.code == ErrorCode::NotFound => return Ok(None),
            Err(err) => {
                tracing::error!(tenant_id = %tenant_id, error = %err, "Tenant lookup failed");
                return Err(BillingError::infrastructure(err.to_string()));
            }
        };

        BillingAccessPolicy::check_status(tenant.status(), operation)?;
        Ok(Some(tenant.status()))
    }
}
