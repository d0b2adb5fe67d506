//! HTTP DTOs for the public and tenant-facing billing endpoints.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{ClaimLicenseKeyResult, SubscribeResult};
use crate::domain::billing::TenantStatus;
use crate::ports::PortalSession;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/v1/public/license/claim`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimLicenseKeyRequest {
    pub email: String,
    pub password: SecretString,
    pub display_name: String,
    pub tenant_name: String,
    pub license_key: SecretString,
}

/// Body of `POST /api/v1/public/subscribe`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    pub password: SecretString,
    pub display_name: String,
    pub tenant_name: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}

impl WebhookAck {
    pub const OK: WebhookAck = WebhookAck { status: "ok" };
    pub const IGNORED: WebhookAck = WebhookAck { status: "ignored" };
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimLicenseKeyResponse {
    pub tenant_id: String,
    pub admin_id: String,
    pub tenant_name: String,
}

impl From<ClaimLicenseKeyResult> for ClaimLicenseKeyResponse {
    fn from(result: ClaimLicenseKeyResult) -> Self {
        Self {
            tenant_id: result.tenant_id.to_string(),
            admin_id: result.admin_id.to_string(),
            tenant_name: result.tenant_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeResponse {
    pub tenant_id: String,
    /// Stripe-hosted checkout page.
    pub checkout_url: String,
}

impl From<SubscribeResult> for SubscribeResponse {
    fn from(result: SubscribeResult) -> Self {
        Self {
            tenant_id: result.tenant_id.to_string(),
            checkout_url: result.checkout_url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortalSessionResponse {
    pub url: String,
}

impl From<PortalSession> for PortalSessionResponse {
    fn from(session: PortalSession) -> Self {
        Self { url: session.url }
    }
}

/// What the billing gates decided for the calling tenant.
#[derive(Debug, Clone, Serialize)]
pub struct TenantAccessResponse {
    pub tenant_id: String,
    pub status: Option<TenantStatus>,
    /// True when writes would be rejected by the billing guard.
    pub read_only: bool,
}

impl TenantAccessResponse {
    pub fn new(tenant_id: impl ToString, status: Option<TenantStatus>) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            read_only: !matches!(status, Some(TenantStatus::Active) | None),
            status,
        }
    }
}
