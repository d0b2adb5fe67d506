//! ListAuditLogsHandler - admin query over the billing audit trail.

use std::sync::Arc;

use crate::domain::billing::{BillingAuditLog, BillingError};
use crate::ports::{AuditLogQuery, BillingAuditLogRepository, Page};

pub struct ListAuditLogsHandler {
    audit_logs: Arc<dyn BillingAuditLogRepository>,
}

impl ListAuditLogsHandler {
    pub fn new(audit_logs: Arc<dyn BillingAuditLogRepository>) -> Self {
        Self { audit_logs }
    }

    pub async fn handle(
        &self,
        query: AuditLogQuery,
    ) -> Result<Page<BillingAuditLog>, BillingError> {
        Ok(self.audit_logs.list(&query).await?)
    }
}
