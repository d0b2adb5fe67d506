//! Row types and conversions between Postgres rows and billing aggregates.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::billing::{
    ActorType, Admin, AdminRole, BillingAuditLog, Entitlement, LicenseKey, Subscription, Tenant,
    WebhookEventRecord, WebhookResult,
};
use crate::domain::foundation::{
    AdminId, AuditLogId, DomainError, EntitlementId, ErrorCode, LicenseKeyId, SubscriptionId,
    TenantId, Timestamp,
};

pub(super) const TENANT_COLUMNS: &str =
    "id, name, status, grace_until, pending_stripe_session_id, created_at, updated_at";

pub(super) const ADMIN_COLUMNS: &str =
    "id, tenant_id, email, display_name, password_hash, role, created_at";

pub(super) const ENTITLEMENT_COLUMNS: &str =
    "id, tenant_id, plan_code, source, starts_at, revoked_at";

pub(super) const LICENSE_KEY_COLUMNS: &str = "id, key_hash, key_hint, status, expires_at, memo, \
     claimed_at, claimed_by, created_at, updated_at";

pub(super) const SUBSCRIPTION_COLUMNS: &str = "id, tenant_id, stripe_customer_id, \
     stripe_subscription_id, status, current_period_end, created_at, updated_at";

pub(super) const WEBHOOK_EVENT_COLUMNS: &str =
    "external_event_id, event_type, result, reason, payload, processed_at";

pub(super) const AUDIT_LOG_COLUMNS: &str = "id, actor_type, actor_id, action, target_type, \
     target_id, before_json, after_json, ip_address, user_agent, created_at";

/// Maps a sqlx error into a `DomainError`, surfacing unique violations.
pub(super) fn db_error(context: &str, err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return DomainError::new(ErrorCode::AlreadyExists, format!("{}: duplicate", context));
        }
    }
    tracing::error!(error = %err, context, "Database operation failed");
    DomainError::database(format!("{}: {}", context, err))
}

fn corrupt(field: &str, value: &str) -> DomainError {
    DomainError::database(format!("invalid {} value in database: {}", field, value))
}

fn ts(dt: DateTime<Utc>) -> Timestamp {
    Timestamp::from_datetime(dt)
}

pub(super) fn opt_dt(t: Option<Timestamp>) -> Option<DateTime<Utc>> {
    t.map(|t| *t.as_datetime())
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct TenantRow {
    id: Uuid,
    name: String,
    status: String,
    grace_until: Option<DateTime<Utc>>,
    pending_stripe_session_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = DomainError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| corrupt("tenant status", &row.status))?;
        Ok(Tenant::reconstitute(
            TenantId::from_uuid(row.id),
            row.name,
            status,
            row.grace_until.map(ts),
            row.pending_stripe_session_id,
            ts(row.created_at),
            ts(row.updated_at),
        ))
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct AdminRow {
    id: Uuid,
    tenant_id: Uuid,
    email: String,
    display_name: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdminRow> for Admin {
    type Error = DomainError;

    fn try_from(row: AdminRow) -> Result<Self, Self::Error> {
        let role = match row.role.as_str() {
            "owner" => AdminRole::Owner,
            "manager" => AdminRole::Manager,
            other => return Err(corrupt("admin role", other)),
        };
        Ok(Admin {
            id: AdminId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            email: row.email,
            display_name: row.display_name,
            password_hash: row.password_hash,
            role,
            created_at: ts(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct EntitlementRow {
    id: Uuid,
    tenant_id: Uuid,
    plan_code: String,
    source: String,
    starts_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

impl TryFrom<EntitlementRow> for Entitlement {
    type Error = DomainError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        let source = row
            .source
            .parse()
            .map_err(|_| corrupt("entitlement source", &row.source))?;
        Ok(Entitlement {
            id: EntitlementId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            plan_code: row.plan_code,
            source,
            starts_at: ts(row.starts_at),
            revoked_at: row.revoked_at.map(ts),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct LicenseKeyRow {
    id: Uuid,
    key_hash: String,
    key_hint: String,
    status: String,
    expires_at: Option<DateTime<Utc>>,
    memo: String,
    claimed_at: Option<DateTime<Utc>>,
    claimed_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LicenseKeyRow> for LicenseKey {
    type Error = DomainError;

    fn try_from(row: LicenseKeyRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|_| corrupt("license key status", &row.status))?;
        Ok(LicenseKey {
            id: LicenseKeyId::from_uuid(row.id),
            key_hash: row.key_hash,
            key_hint: row.key_hint,
            status,
            expires_at: row.expires_at.map(ts),
            memo: row.memo,
            claimed_at: row.claimed_at.map(ts),
            claimed_by: row.claimed_by.map(TenantId::from_uuid),
            created_at: ts(row.created_at),
            updated_at: ts(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct SubscriptionRow {
    id: Uuid,
    tenant_id: Uuid,
    stripe_customer_id: String,
    stripe_subscription_id: String,
    status: String,
    current_period_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            id: SubscriptionId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            stripe_customer_id: row.stripe_customer_id,
            stripe_subscription_id: row.stripe_subscription_id,
            status: row.status,
            current_period_end: row.current_period_end.map(ts),
            created_at: ts(row.created_at),
            updated_at: ts(row.updated_at),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct WebhookEventRow {
    external_event_id: String,
    event_type: String,
    result: String,
    reason: Option<String>,
    payload: Option<String>,
    processed_at: DateTime<Utc>,
}

impl TryFrom<WebhookEventRow> for WebhookEventRecord {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        let result = WebhookResult::parse(&row.result)
            .ok_or_else(|| corrupt("webhook result", &row.result))?;
        Ok(WebhookEventRecord {
            external_event_id: row.external_event_id,
            event_type: row.event_type,
            result,
            reason: row.reason,
            payload: row.payload,
            processed_at: ts(row.processed_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct AuditLogRow {
    id: Uuid,
    actor_type: String,
    actor_id: Option<String>,
    action: String,
    target_type: Option<String>,
    target_id: Option<String>,
    before_json: Option<serde_json::Value>,
    after_json: Option<serde_json::Value>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditLogRow> for BillingAuditLog {
    type Error = DomainError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        let actor_type: ActorType = row
            .actor_type
            .parse()
            .map_err(|_| corrupt("audit actor type", &row.actor_type))?;
        Ok(BillingAuditLog {
            id: AuditLogId::from_uuid(row.id),
            actor_type,
            actor_id: row.actor_id,
            action: row.action,
            target_type: row.target_type,
            target_id: row.target_id,
            before_json: row.before_json,
            after_json: row.after_json,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: ts(row.created_at),
        })
    }
}
