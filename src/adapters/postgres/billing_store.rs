//! PostgreSQL implementation of the billing read repositories and
//! `TransactionManager`.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::{
    Admin, BillingAuditLog, Entitlement, LicenseKey, Subscription, Tenant, WebhookEventRecord,
};
use crate::domain::foundation::{AdminId, DomainError, LicenseKeyId, TenantId};
use crate::ports::{
    AdminRepository, AuditLogQuery, BillingAuditLogRepository, BillingTransaction,
    EntitlementRepository, LicenseKeyFilter, LicenseKeyRepository, Page, SubscriptionRepository,
    TenantFilter, TenantRepository, TransactionManager, WebhookEventRepository,
};

use super::rows::{
    db_error, AdminRow, AuditLogRow, EntitlementRow, LicenseKeyRow, SubscriptionRow, TenantRow,
    WebhookEventRow, ADMIN_COLUMNS, AUDIT_LOG_COLUMNS, ENTITLEMENT_COLUMNS, LICENSE_KEY_COLUMNS,
    SUBSCRIPTION_COLUMNS, TENANT_COLUMNS, WEBHOOK_EVENT_COLUMNS,
};
use super::transaction::PostgresBillingTransaction;

/// Matches `$1` against the effective status: unclaimed keys past
/// `expires_at` count as expired.
const LICENSE_KEY_STATUS_FILTER: &str = "($1::text IS NULL
    OR ($1 = 'expired' AND (status = 'expired'
        OR (status = 'unclaimed' AND expires_at <= now())))
    OR ($1 = 'unclaimed' AND status = 'unclaimed'
        AND (expires_at IS NULL OR expires_at > now()))
    OR ($1 NOT IN ('expired', 'unclaimed') AND status = $1))";

/// Pool-backed billing store.
///
/// Reads go straight to the pool; every mutation runs inside a
/// `PostgresBillingTransaction` obtained from `begin`.
#[derive(Clone)]
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TransactionManager for PostgresBillingStore {
    async fn begin(&self) -> Result<Box<dyn BillingTransaction>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;
        Ok(Box::new(PostgresBillingTransaction::new(tx)))
    }
}

fn total(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

#[async_trait]
impl TenantRepository for PostgresBillingStore {
    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> =
            sqlx::query_as(&format!("SELECT {} FROM tenants WHERE id = $1", TENANT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find tenant", e))?;

        row.map(Tenant::try_from).transpose()
    }

    async fn list(&self, filter: &TenantFilter) -> Result<Page<Tenant>, DomainError> {
        let status = filter.status.map(|s| s.as_str());

        let rows: Vec<TenantRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tenants
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3",
            TENANT_COLUMNS
        ))
        .bind(status)
        .bind(i64::from(filter.page.limit))
        .bind(i64::from(filter.page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list tenants", e))?;

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tenants WHERE ($1::text IS NULL OR status = $1)")
                .bind(status)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("count tenants", e))?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(Tenant::try_from)
                .collect::<Result<_, _>>()?,
            total: total(count),
        })
    }
}

#[async_trait]
impl EntitlementRepository for PostgresBillingStore {
    async fn list_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Entitlement>, DomainError> {
        let rows: Vec<EntitlementRow> = sqlx::query_as(&format!(
            "SELECT {} FROM entitlements WHERE tenant_id = $1 ORDER BY starts_at, id",
            ENTITLEMENT_COLUMNS
        ))
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list entitlements", e))?;

        rows.into_iter().map(Entitlement::try_from).collect()
    }

    async fn has_revoked(&self, tenant_id: TenantId) -> Result<bool, DomainError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (
                SELECT 1 FROM entitlements WHERE tenant_id = $1 AND revoked_at IS NOT NULL
            )",
        )
        .bind(tenant_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("check revoked entitlements", e))?;

        Ok(exists)
    }
}

#[async_trait]
impl LicenseKeyRepository for PostgresBillingStore {
    async fn find_by_id(&self, id: LicenseKeyId) -> Result<Option<LicenseKey>, DomainError> {
        let row: Option<LicenseKeyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM license_keys WHERE id = $1",
            LICENSE_KEY_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find license key", e))?;

        row.map(LicenseKey::try_from).transpose()
    }

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<LicenseKey>, DomainError> {
        let row: Option<LicenseKeyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM license_keys WHERE key_hash = $1",
            LICENSE_KEY_COLUMNS
        ))
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find license key by hash", e))?;

        row.map(LicenseKey::try_from).transpose()
    }

    async fn list(&self, filter: &LicenseKeyFilter) -> Result<Page<LicenseKey>, DomainError> {
        let status = filter.status.map(|s| s.as_str());

        let rows: Vec<LicenseKeyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM license_keys
             WHERE {}
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3",
            LICENSE_KEY_COLUMNS, LICENSE_KEY_STATUS_FILTER
        ))
        .bind(status)
        .bind(i64::from(filter.page.limit))
        .bind(i64::from(filter.page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list license keys", e))?;

        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM license_keys WHERE {}",
            LICENSE_KEY_STATUS_FILTER
        ))
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("count license keys", e))?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(LicenseKey::try_from)
                .collect::<Result<_, _>>()?,
            total: total(count),
        })
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresBillingStore {
    async fn find_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE tenant_id = $1
             ORDER BY updated_at DESC LIMIT 1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find subscription", e))?;

        Ok(row.map(Subscription::from))
    }

    async fn find_by_stripe_subscription_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE stripe_subscription_id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(stripe_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find subscription by stripe id", e))?;

        Ok(row.map(Subscription::from))
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresBillingStore {
    async fn find_by_event_id(
        &self,
        external_event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM webhook_events WHERE external_event_id = $1",
            WEBHOOK_EVENT_COLUMNS
        ))
        .bind(external_event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find webhook event", e))?;

        row.map(WebhookEventRecord::try_from).transpose()
    }
}

#[async_trait]
impl BillingAuditLogRepository for PostgresBillingStore {
    async fn list(&self, query: &AuditLogQuery) -> Result<Page<BillingAuditLog>, DomainError> {
        let action = query.action.as_deref();

        let rows: Vec<AuditLogRow> = sqlx::query_as(&format!(
            "SELECT {} FROM billing_audit_logs
             WHERE ($1::text IS NULL OR action = $1)
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3",
            AUDIT_LOG_COLUMNS
        ))
        .bind(action)
        .bind(i64::from(query.page.limit))
        .bind(i64::from(query.page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list audit logs", e))?;

        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM billing_audit_logs WHERE ($1::text IS NULL OR action = $1)",
        )
        .bind(action)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("count audit logs", e))?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(BillingAuditLog::try_from)
                .collect::<Result<_, _>>()?,
            total: total(count),
        })
    }
}

#[async_trait]
impl AdminRepository for PostgresBillingStore {
    async fn find_by_id(&self, id: AdminId) -> Result<Option<Admin>, DomainError> {
        let row: Option<AdminRow> =
            sqlx::query_as(&format!("SELECT {} FROM admins WHERE id = $1", ADMIN_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find admin", e))?;

        row.map(Admin::try_from).transpose()
    }

    async fn list_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Admin>, DomainError> {
        let rows: Vec<AdminRow> = sqlx::query_as(&format!(
            "SELECT {} FROM admins WHERE tenant_id = $1 ORDER BY created_at, id",
            ADMIN_COLUMNS
        ))
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list admins", e))?;

        rows.into_iter().map(Admin::try_from).collect()
    }
}

impl std::fmt::Debug for PostgresBillingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBillingStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_count_clamps_to_zero() {
        assert_eq!(total(-1), 0);
        assert_eq!(total(42), 42);
    }

    #[test]
    fn store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresBillingStore>();
    }
}
