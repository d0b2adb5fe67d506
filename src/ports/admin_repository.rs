//! AdminRepository port.

use async_trait::async_trait;

use crate::domain::billing::Admin;
use crate::domain::foundation::{AdminId, DomainError, TenantId};

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn find_by_id(&self, id: AdminId) -> Result<Option<Admin>, DomainError>;

    async fn list_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Admin>, DomainError>;
}
