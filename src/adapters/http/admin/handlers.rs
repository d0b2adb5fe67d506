//! HTTP handlers for the platform admin billing API.
//!
//! Every route here runs behind `admin_auth`; mutating routes record the
//! resolved `AdminActor` and the client origin in the audit trail.

use std::str::FromStr;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireAdmin;
use crate::adapters::http::origin::ClientOrigin;
use crate::adapters::http::state::BillingAppState;
use crate::application::handlers::billing::{
    GenerateLicenseKeysCommand, GrantEntitlementCommand, RevokeEntitlementCommand,
    RevokeLicenseKeyCommand, UpdateTenantStatusCommand,
};
use crate::domain::billing::{BillingError, LicenseKeyStatus, TenantStatus};
use crate::domain::foundation::{EntitlementId, LicenseKeyId, TenantId, Timestamp};
use crate::ports::{AuditLogQuery, LicenseKeyFilter, PageRequest, TenantFilter};

use super::dto::{
    AuditLogListQuery, AuditLogResponse, EntitlementResponse, GenerateLicenseKeysRequest,
    GenerateLicenseKeysResponse, GrantEntitlementRequest, LicenseKeyResponse, ListQuery,
    PageResponse, TenantDetailResponse, TenantResponse, UpdateTenantStatusRequest,
};

fn parse_id<T: FromStr>(field: &str, raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError(BillingError::validation(field, "must be a UUID")))
}

fn parse_status<T: FromStr>(raw: Option<&str>) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|_| {
            ApiError(BillingError::validation(
                "status",
                format!("unknown status '{}'", s),
            ))
        }),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// License keys
// ════════════════════════════════════════════════════════════════════════════════

/// `GET /api/v1/admin/license-keys`
pub async fn list_license_keys(
    State(state): State<BillingAppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = LicenseKeyFilter {
        status: parse_status::<LicenseKeyStatus>(query.status.as_deref())?,
        page: query.page(),
    };

    let page = state.list_license_keys_handler().handle(filter).await?;
    let now = Timestamp::now();
    Ok(Json(PageResponse::map(page, |key| {
        LicenseKeyResponse::from_key(key, now)
    })))
}

/// `POST /api/v1/admin/license-keys`
///
/// The raw keys appear in this response only.
pub async fn generate_license_keys(
    State(state): State<BillingAppState>,
    RequireAdmin(admin): RequireAdmin,
    ClientOrigin(origin): ClientOrigin,
    payload: Result<Json<GenerateLicenseKeysRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let issued = state
        .generate_license_keys_handler()
        .handle(GenerateLicenseKeysCommand {
            count: req.count,
            expires_at: req.expires_at.map(Timestamp::from_datetime),
            memo: req.memo,
            actor: admin,
            origin,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateLicenseKeysResponse {
            keys: issued.into_iter().map(Into::into).collect(),
        }),
    ))
}

/// `POST /api/v1/admin/license-keys/:id/revoke`
pub async fn revoke_license_key(
    State(state): State<BillingAppState>,
    RequireAdmin(admin): RequireAdmin,
    ClientOrigin(origin): ClientOrigin,
    Path(key_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let key_id: LicenseKeyId = parse_id("id", &key_id)?;

    let key = state
        .revoke_license_key_handler()
        .handle(RevokeLicenseKeyCommand {
            key_id,
            actor: admin,
            origin,
        })
        .await?;

    Ok(Json(LicenseKeyResponse::from_key(key, Timestamp::now())))
}

// ════════════════════════════════════════════════════════════════════════════════
// Tenants
// ════════════════════════════════════════════════════════════════════════════════

/// `GET /api/v1/admin/tenants`
pub async fn list_tenants(
    State(state): State<BillingAppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = TenantFilter {
        status: parse_status::<TenantStatus>(query.status.as_deref())?,
        page: query.page(),
    };

    let page = state.list_tenants_handler().handle(filter).await?;
    Ok(Json(PageResponse::map(page, TenantResponse::from)))
}

/// `GET /api/v1/admin/tenants/:id`
pub async fn get_tenant(
    State(state): State<BillingAppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(tenant_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id: TenantId = parse_id("id", &tenant_id)?;
    let detail = state.tenant_detail_handler().handle(tenant_id).await?;
    Ok(Json(TenantDetailResponse::from(detail)))
}

/// `PUT /api/v1/admin/tenants/:id/status`
///
/// `suspended` → `active` is the admin reinstatement.
pub async fn update_tenant_status(
    State(state): State<BillingAppState>,
    RequireAdmin(admin): RequireAdmin,
    ClientOrigin(origin): ClientOrigin,
    Path(tenant_id): Path<String>,
    payload: Result<Json<UpdateTenantStatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id: TenantId = parse_id("id", &tenant_id)?;
    let Json(req) = payload?;
    let status = parse_status::<TenantStatus>(Some(&req.status))?
        .ok_or_else(|| ApiError(BillingError::validation("status", "is required")))?;

    let tenant = state
        .update_tenant_status_handler()
        .handle(UpdateTenantStatusCommand {
            tenant_id,
            status,
            grace_until: req.grace_until.map(Timestamp::from_datetime),
            actor: admin,
            origin,
        })
        .await?;

    Ok(Json(TenantResponse::from(tenant)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Entitlements
// ════════════════════════════════════════════════════════════════════════════════

/// `POST /api/v1/admin/tenants/:id/entitlements`
pub async fn grant_entitlement(
    State(state): State<BillingAppState>,
    RequireAdmin(admin): RequireAdmin,
    ClientOrigin(origin): ClientOrigin,
    Path(tenant_id): Path<String>,
    payload: Result<Json<GrantEntitlementRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id: TenantId = parse_id("id", &tenant_id)?;
    let Json(req) = payload?;

    let entitlement = state
        .grant_entitlement_handler()
        .handle(GrantEntitlementCommand {
            tenant_id,
            plan_code: req.plan_code,
            actor: admin,
            origin,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(EntitlementResponse::from(entitlement))))
}

/// `POST /api/v1/admin/tenants/:id/entitlements/:entitlement_id/revoke`
pub async fn revoke_entitlement(
    State(state): State<BillingAppState>,
    RequireAdmin(admin): RequireAdmin,
    ClientOrigin(origin): ClientOrigin,
    Path((tenant_id, entitlement_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id: TenantId = parse_id("id", &tenant_id)?;
    let entitlement_id: EntitlementId = parse_id("entitlement_id", &entitlement_id)?;

    let entitlement = state
        .revoke_entitlement_handler()
        .handle(RevokeEntitlementCommand {
            tenant_id,
            entitlement_id,
            actor: admin,
            origin,
        })
        .await?;

    Ok(Json(EntitlementResponse::from(entitlement)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Audit trail
// ════════════════════════════════════════════════════════════════════════════════

/// `GET /api/v1/admin/audit-logs`
pub async fn list_audit_logs(
    State(state): State<BillingAppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<AuditLogListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let query = AuditLogQuery {
        action: query
            .action
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()),
        page: PageRequest::new(query.limit, query.offset),
    };

    let page = state.list_audit_logs_handler().handle(query).await?;
    Ok(Json(PageResponse::map(page, AuditLogResponse::from)))
}
