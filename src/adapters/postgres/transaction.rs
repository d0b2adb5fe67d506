//! Scoped Postgres transaction for billing mutations.
//!
//! Rows read through `*_for_update` are locked with `FOR UPDATE` until the
//! transaction ends. Dropping without `commit` rolls back.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::domain::billing::{
    Admin, BillingAuditLog, Entitlement, LicenseKey, Subscription, Tenant, WebhookEventRecord,
};
use crate::domain::foundation::{DomainError, LicenseKeyId, TenantId, Timestamp};
use crate::ports::{BillingTransaction, SaveResult};

use super::rows::{
    db_error, opt_dt, EntitlementRow, LicenseKeyRow, SubscriptionRow, TenantRow,
    ENTITLEMENT_COLUMNS, LICENSE_KEY_COLUMNS, SUBSCRIPTION_COLUMNS, TENANT_COLUMNS,
};

pub struct PostgresBillingTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PostgresBillingTransaction {
    pub(super) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

fn expect_one(rows_affected: u64, what: &str) -> Result<(), DomainError> {
    if rows_affected == 0 {
        return Err(DomainError::not_found(format!("{} not found", what)));
    }
    Ok(())
}

#[async_trait]
impl BillingTransaction for PostgresBillingTransaction {
    async fn find_tenant_for_update(
        &mut self,
        id: TenantId,
    ) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tenants WHERE id = $1 FOR UPDATE",
            TENANT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("lock tenant", e))?;

        row.map(Tenant::try_from).transpose()
    }

    async fn find_tenant_by_pending_session(
        &mut self,
        session_id: &str,
    ) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tenants WHERE pending_stripe_session_id = $1 FOR UPDATE",
            TENANT_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("lock tenant by checkout session", e))?;

        row.map(Tenant::try_from).transpose()
    }

    async fn insert_tenant(&mut self, tenant: &Tenant) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tenants (
                id, name, status, grace_until, pending_stripe_session_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(tenant.id().as_uuid())
        .bind(tenant.name())
        .bind(tenant.status().as_str())
        .bind(opt_dt(tenant.grace_until()))
        .bind(tenant.pending_stripe_session_id())
        .bind(tenant.created_at().as_datetime())
        .bind(tenant.updated_at().as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("insert tenant", e))?;

        Ok(())
    }

    async fn update_tenant(&mut self, tenant: &Tenant) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE tenants SET
                name = $2,
                status = $3,
                grace_until = $4,
                pending_stripe_session_id = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(tenant.id().as_uuid())
        .bind(tenant.name())
        .bind(tenant.status().as_str())
        .bind(opt_dt(tenant.grace_until()))
        .bind(tenant.pending_stripe_session_id())
        .bind(tenant.updated_at().as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("update tenant", e))?;

        expect_one(result.rows_affected(), "tenant")
    }

    async fn insert_admin(&mut self, admin: &Admin) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO admins (
                id, tenant_id, email, display_name, password_hash, role, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(admin.id.as_uuid())
        .bind(admin.tenant_id.as_uuid())
        .bind(&admin.email)
        .bind(&admin.display_name)
        .bind(&admin.password_hash)
        .bind(admin.role.as_str())
        .bind(admin.created_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("insert admin", e))?;

        Ok(())
    }

    async fn list_entitlements(
        &mut self,
        tenant_id: TenantId,
    ) -> Result<Vec<Entitlement>, DomainError> {
        let rows: Vec<EntitlementRow> = sqlx::query_as(&format!(
            "SELECT {} FROM entitlements WHERE tenant_id = $1 ORDER BY starts_at, id FOR UPDATE",
            ENTITLEMENT_COLUMNS
        ))
        .bind(tenant_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("lock entitlements", e))?;

        rows.into_iter().map(Entitlement::try_from).collect()
    }

    async fn insert_entitlement(&mut self, entitlement: &Entitlement) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO entitlements (id, tenant_id, plan_code, source, starts_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entitlement.id.as_uuid())
        .bind(entitlement.tenant_id.as_uuid())
        .bind(&entitlement.plan_code)
        .bind(entitlement.source.as_str())
        .bind(entitlement.starts_at.as_datetime())
        .bind(opt_dt(entitlement.revoked_at))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("insert entitlement", e))?;

        Ok(())
    }

    async fn update_entitlement(&mut self, entitlement: &Entitlement) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE entitlements SET plan_code = $2, revoked_at = $3 WHERE id = $1",
        )
        .bind(entitlement.id.as_uuid())
        .bind(&entitlement.plan_code)
        .bind(opt_dt(entitlement.revoked_at))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("update entitlement", e))?;

        expect_one(result.rows_affected(), "entitlement")
    }

    async fn find_license_key_for_update(
        &mut self,
        id: LicenseKeyId,
    ) -> Result<Option<LicenseKey>, DomainError> {
        let row: Option<LicenseKeyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM license_keys WHERE id = $1 FOR UPDATE",
            LICENSE_KEY_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("lock license key", e))?;

        row.map(LicenseKey::try_from).transpose()
    }

    async fn insert_license_key(&mut self, key: &LicenseKey) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO license_keys (
                id, key_hash, key_hint, status, expires_at, memo,
                claimed_at, claimed_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(key.id.as_uuid())
        .bind(&key.key_hash)
        .bind(&key.key_hint)
        .bind(key.status.as_str())
        .bind(opt_dt(key.expires_at))
        .bind(&key.memo)
        .bind(opt_dt(key.claimed_at))
        .bind(key.claimed_by.map(|t| *t.as_uuid()))
        .bind(key.created_at.as_datetime())
        .bind(key.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("insert license key", e))?;

        Ok(())
    }

    async fn claim_license_key(
        &mut self,
        id: LicenseKeyId,
        tenant_id: TenantId,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        // Conditional on the row still being claimable; concurrent claimers
        // serialize on the row lock and all but one see zero rows.
        let result = sqlx::query(
            r#"
            UPDATE license_keys SET
                status = 'claimed',
                claimed_at = $3,
                claimed_by = $2,
                updated_at = $3
            WHERE id = $1
              AND status = 'unclaimed'
              AND (expires_at IS NULL OR expires_at > $3)
            "#,
        )
        .bind(id.as_uuid())
        .bind(tenant_id.as_uuid())
        .bind(now.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("claim license key", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_license_key(&mut self, key: &LicenseKey) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE license_keys SET
                status = $2,
                expires_at = $3,
                memo = $4,
                claimed_at = $5,
                claimed_by = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(key.id.as_uuid())
        .bind(key.status.as_str())
        .bind(opt_dt(key.expires_at))
        .bind(&key.memo)
        .bind(opt_dt(key.claimed_at))
        .bind(key.claimed_by.map(|t| *t.as_uuid()))
        .bind(key.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("update license key", e))?;

        expect_one(result.rows_affected(), "license key")
    }

    async fn find_subscription_by_stripe_id(
        &mut self,
        stripe_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE stripe_subscription_id = $1 FOR UPDATE",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(stripe_subscription_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("lock subscription", e))?;

        Ok(row.map(Subscription::from))
    }

    async fn upsert_subscription(
        &mut self,
        subscription: &Subscription,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, tenant_id, stripe_customer_id, stripe_subscription_id, status,
                current_period_end, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (stripe_subscription_id) DO UPDATE SET
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                status = EXCLUDED.status,
                current_period_end = EXCLUDED.current_period_end,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.tenant_id.as_uuid())
        .bind(&subscription.stripe_customer_id)
        .bind(&subscription.stripe_subscription_id)
        .bind(&subscription.status)
        .bind(opt_dt(subscription.current_period_end))
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("upsert subscription", e))?;

        Ok(())
    }

    async fn insert_webhook_event(
        &mut self,
        record: &WebhookEventRecord,
    ) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (
                external_event_id, event_type, result, reason, payload, processed_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (external_event_id) DO NOTHING
            "#,
        )
        .bind(&record.external_event_id)
        .bind(&record.event_type)
        .bind(record.result.as_str())
        .bind(&record.reason)
        .bind(&record.payload)
        .bind(record.processed_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("insert webhook event", e))?;

        Ok(if result.rows_affected() == 0 {
            SaveResult::AlreadyExists
        } else {
            SaveResult::Inserted
        })
    }

    async fn append_audit_log(&mut self, entry: &BillingAuditLog) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO billing_audit_logs (
                id, actor_type, actor_id, action, target_type, target_id,
                before_json, after_json, ip_address, user_agent, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.actor_type.as_str())
        .bind(&entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.target_type)
        .bind(&entry.target_id)
        .bind(&entry.before_json)
        .bind(&entry.after_json)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.created_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("append audit log", e))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| db_error("commit transaction", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rows_affected_is_not_found() {
        let err = expect_one(0, "tenant").unwrap_err();
        assert_eq!(err.code, crate::domain::foundation::ErrorCode::NotFound);
        assert!(expect_one(1, "tenant").is_ok());
    }

    #[test]
    fn transaction_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<PostgresBillingTransaction>();
    }
}
