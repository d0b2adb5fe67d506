//! HTTP DTOs for the platform admin API.

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::TenantDetail;
use crate::domain::billing::{
    Admin, BillingAuditLog, Entitlement, IssuedLicenseKey, LicenseKey, Subscription, Tenant,
};
use crate::domain::foundation::Timestamp;
use crate::ports::{Page, PageRequest};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Common `?status=&limit=&offset=` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

impl ListQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.limit, self.offset)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogListQuery {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateLicenseKeysRequest {
    /// Missing or non-positive means one key.
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTenantStatusRequest {
    pub status: String,
    #[serde(default)]
    pub grace_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrantEntitlementRequest {
    pub plan_code: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> PageResponse<T> {
    pub fn map<U>(page: Page<U>, f: impl FnMut(U) -> T) -> Self {
        Self {
            items: page.items.into_iter().map(f).collect(),
            total: page.total,
        }
    }
}

/// License key as operators see it. The digest never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseKeyResponse {
    pub id: String,
    pub key_hint: String,
    /// Stored status, with unclaimed keys past expiry reported as `expired`.
    pub status: String,
    pub expires_at: Option<Timestamp>,
    pub memo: String,
    pub claimed_at: Option<Timestamp>,
    pub claimed_by: Option<String>,
    pub created_at: Timestamp,
}

impl LicenseKeyResponse {
    pub fn from_key(key: LicenseKey, now: Timestamp) -> Self {
        Self {
            id: key.id.to_string(),
            status: key.effective_status(now).as_str().to_string(),
            key_hint: key.key_hint,
            expires_at: key.expires_at,
            memo: key.memo,
            claimed_at: key.claimed_at,
            claimed_by: key.claimed_by.map(|t| t.to_string()),
            created_at: key.created_at,
        }
    }
}

/// A generated key. `license_key` is shown exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedLicenseKeyResponse {
    pub id: String,
    pub license_key: String,
    pub key_hint: String,
    pub expires_at: Option<Timestamp>,
}

impl From<IssuedLicenseKey> for IssuedLicenseKeyResponse {
    fn from(issued: IssuedLicenseKey) -> Self {
        Self {
            id: issued.key.id.to_string(),
            license_key: issued.raw_key.expose_secret().clone(),
            key_hint: issued.key.key_hint,
            expires_at: issued.key.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateLicenseKeysResponse {
    pub keys: Vec<IssuedLicenseKeyResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantResponse {
    pub id: String,
    pub name: String,
    pub status: String,
    pub grace_until: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Tenant> for TenantResponse {
    fn from(tenant: Tenant) -> Self {
        Self {
            id: tenant.id().to_string(),
            name: tenant.name().to_string(),
            status: tenant.status().as_str().to_string(),
            grace_until: tenant.grace_until(),
            created_at: tenant.created_at(),
            updated_at: tenant.updated_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntitlementResponse {
    pub id: String,
    pub tenant_id: String,
    pub plan_code: String,
    pub source: String,
    pub starts_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
}

impl From<Entitlement> for EntitlementResponse {
    fn from(e: Entitlement) -> Self {
        Self {
            id: e.id.to_string(),
            tenant_id: e.tenant_id.to_string(),
            plan_code: e.plan_code,
            source: e.source.as_str().to_string(),
            starts_at: e.starts_at,
            revoked_at: e.revoked_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub stripe_customer_id: String,
    pub stripe_subscription_id: String,
    pub status: String,
    pub current_period_end: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(s: Subscription) -> Self {
        Self {
            stripe_customer_id: s.stripe_customer_id,
            stripe_subscription_id: s.stripe_subscription_id,
            status: s.status,
            current_period_end: s.current_period_end,
            updated_at: s.updated_at,
        }
    }
}

/// Tenant admin without credentials.
#[derive(Debug, Clone, Serialize)]
pub struct TenantAdminResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub created_at: Timestamp,
}

impl From<Admin> for TenantAdminResponse {
    fn from(a: Admin) -> Self {
        Self {
            id: a.id.to_string(),
            email: a.email,
            display_name: a.display_name,
            role: a.role.as_str().to_string(),
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantDetailResponse {
    pub tenant: TenantResponse,
    pub entitlements: Vec<EntitlementResponse>,
    pub subscription: Option<SubscriptionResponse>,
    pub admins: Vec<TenantAdminResponse>,
}

impl From<TenantDetail> for TenantDetailResponse {
    fn from(detail: TenantDetail) -> Self {
        Self {
            tenant: detail.tenant.into(),
            entitlements: detail.entitlements.into_iter().map(Into::into).collect(),
            subscription: detail.subscription.map(Into::into),
            admins: detail.admins.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditLogResponse {
    pub id: String,
    pub actor_type: String,
    pub actor_id: Option<String>,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
}

impl From<BillingAuditLog> for AuditLogResponse {
    fn from(log: BillingAuditLog) -> Self {
        Self {
            id: log.id.to_string(),
            actor_type: log.actor_type.as_str().to_string(),
            actor_id: log.actor_id,
            action: log.action,
            target_type: log.target_type,
            target_id: log.target_id,
            before: log.before_json,
            after: log.after_json,
            ip_address: log.ip_address,
            user_agent: log.user_agent,
            created_at: log.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::LicenseKeyStatus;

    #[test]
    fn list_query_defaults_page() {
        let query: ListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page(), PageRequest::default());
    }

    #[test]
    fn license_key_response_hides_digest() {
        let now = Timestamp::now();
        let issued = LicenseKey::issue(None, "event batch", now).unwrap();
        let json =
            serde_json::to_value(LicenseKeyResponse::from_key(issued.key.clone(), now)).unwrap();

        assert!(json.get("key_hash").is_none());
        assert_eq!(json["status"], LicenseKeyStatus::Unclaimed.as_str());
        assert_eq!(json["key_hint"], issued.key.key_hint.as_str());
    }

    #[test]
    fn expired_unclaimed_key_reports_expired() {
        let now = Timestamp::now();
        let issued = LicenseKey::issue(Some(now.add_days(-1)), "", now.add_days(-2)).unwrap();
        let response = LicenseKeyResponse::from_key(issued.key, now);
        assert_eq!(response.status, LicenseKeyStatus::Expired.as_str());
    }

    #[test]
    fn generate_request_defaults_to_one_key() {
        let req: GenerateLicenseKeysRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.count, 0);
        assert!(req.expires_at.is_none());
    }
}
