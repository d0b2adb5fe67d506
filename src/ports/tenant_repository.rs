//! TenantRepository port - read access to tenants outside a transaction.
//!
//! Mutations go through [`BillingTransaction`](super::BillingTransaction).

use async_trait::async_trait;

use crate::domain::billing::{Tenant, TenantStatus};
use crate::domain::foundation::{DomainError, TenantId};

use super::{Page, PageRequest};

/// Filter for admin tenant listings.
#[derive(Debug, Clone, Default)]
pub struct TenantFilter {
    pub status: Option<TenantStatus>,
    pub page: PageRequest,
}

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, DomainError>;

    /// Newest first.
    async fn list(&self, filter: &TenantFilter) -> Result<Page<Tenant>, DomainError>;
}
