//! BillingAuditLogRepository port - read side of the audit trail.
//!
//! There is no update or delete. Appends happen inside a
//! [`BillingTransaction`](super::BillingTransaction).

use async_trait::async_trait;

use crate::domain::billing::BillingAuditLog;
use crate::domain::foundation::DomainError;

use super::{Page, PageRequest};

#[derive(Debug, Clone, Default)]
pub struct AuditLogQuery {
    pub action: Option<String>,
    pub page: PageRequest,
}

#[async_trait]
pub trait BillingAuditLogRepository: Send + Sync {
    /// Newest first.
    async fn list(&self, query: &AuditLogQuery) -> Result<Page<BillingAuditLog>, DomainError>;
}
