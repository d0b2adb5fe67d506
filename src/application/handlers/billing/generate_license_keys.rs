//! GenerateLicenseKeysHandler - admin batch issuance of license keys.

use std::sync::Arc;

use serde_json::json;

use crate::domain::billing::{
    actions, normalize_batch_size, targets, ActorType, BillingAuditLog, BillingError,
    IssuedLicenseKey, LicenseKey, RequestOrigin,
};
use crate::domain::foundation::Timestamp;
use crate::ports::{AdminActor, TransactionManager};

#[derive(Debug, Clone)]
pub struct GenerateLicenseKeysCommand {
    /// Non-positive means one key; capped at the batch maximum.
    pub count: i64,
    pub expires_at: Option<Timestamp>,
    pub memo: String,
    pub actor: AdminActor,
    pub origin: RequestOrigin,
}

pub struct GenerateLicenseKeysHandler {
    transactions: Arc<dyn TransactionManager>,
}

impl GenerateLicenseKeysHandler {
    pub fn new(transactions: Arc<dyn TransactionManager>) -> Self {
        Self { transactions }
    }

    /// Returns the new keys with their raw material; it is not retrievable later.
    pub async fn handle(
        &self,
        cmd: GenerateLicenseKeysCommand,
    ) -> Result<Vec<IssuedLicenseKey>, BillingError> {
        let now = Timestamp::now();
        let count = normalize_batch_size(cmd.count);

        let issued = (0..count)
            .map(|_| LicenseKey::issue(cmd.expires_at, &cmd.memo, now))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.transactions.begin().await?;
        for key in &issued {
            tx.insert_license_key(&key.key).await?;
        }

        let key_ids: Vec<String> = issued.iter().map(|k| k.key.id.to_string()).collect();
        let entry = BillingAuditLog::builder(ActorType::Admin, actions::LICENSE_KEYS_GENERATED)
            .actor(cmd.actor.id.clone())
            .target(targets::LICENSE_KEY, format!("batch:{}", count))
            .after(json!({
                "count": count,
                "key_ids": key_ids,
                "expires_at": cmd.expires_at,
                "memo": cmd.memo.trim(),
            }))
            .origin(&cmd.origin)
            .build(now);
        tx.append_audit_log(&entry).await?;
        tx.commit().await?;

        tracing::info!(count, actor = %cmd.actor.id, "License keys generated");
        Ok(issued)
    }
}
