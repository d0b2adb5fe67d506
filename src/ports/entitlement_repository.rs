//! EntitlementRepository port.

use async_trait::async_trait;

use crate::domain::billing::Entitlement;
use crate::domain::foundation::{DomainError, TenantId};

#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// All entitlements of a tenant, revoked ones included, oldest first.
    async fn list_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Entitlement>, DomainError>;

    /// True if any entitlement of the tenant carries `revoked_at`.
    async fn has_revoked(&self, tenant_id: TenantId) -> Result<bool, DomainError>;
}
