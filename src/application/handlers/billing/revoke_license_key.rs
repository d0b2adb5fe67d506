//! RevokeLicenseKeyHandler - admin revocation of a license key.
//!
//! Revoking a claimed key blocks reuse only. The entitlement the claim
//! granted stays active; revoking it is a separate admin operation.

use std::sync::Arc;

use crate::domain::billing::{
    actions, targets, ActorType, BillingAuditLog, BillingError, LicenseKey, RequestOrigin,
};
use crate::domain::foundation::{LicenseKeyId, Timestamp};
use crate::ports::{AdminActor, TransactionManager};

use super::license_key_snapshot;

#[derive(Debug, Clone)]
pub struct RevokeLicenseKeyCommand {
    pub key_id: LicenseKeyId,
    pub actor: AdminActor,
    pub origin: RequestOrigin,
}

pub struct RevokeLicenseKeyHandler {
    transactions: Arc<dyn TransactionManager>,
}

impl RevokeLicenseKeyHandler {
    pub fn new(transactions: Arc<dyn TransactionManager>) -> Self {
        Self { transactions }
    }

    pub async fn handle(&self, cmd: RevokeLicenseKeyCommand) -> Result<LicenseKey, BillingError> {
        let now = Timestamp::now();
        let mut tx = self.transactions.begin().await?;

        let mut key = tx
            .find_license_key_for_update(cmd.key_id)
            .await?
            .ok_or(BillingError::LicenseKeyNotFound)?;
        let before = license_key_snapshot(&key);

        key.revoke(now)?;
        tx.update_license_key(&key).await?;

        let entry = BillingAuditLog::builder(ActorType::Admin, actions::LICENSE_KEY_REVOKED)
            .actor(cmd.actor.id.clone())
            .target(targets::LICENSE_KEY, key.id)
            .before(before)
            .after(license_key_snapshot(&key))
            .origin(&cmd.origin)
            .build(now);
        tx.append_audit_log(&entry).await?;
        tx.commit().await?;

        tracing::info!(key_id = %key.id, actor = %cmd.actor.id, "License key revoked");
        Ok(key)
    }
}
