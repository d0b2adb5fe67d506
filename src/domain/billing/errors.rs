//! Billing error taxonomy.
//!
//! Every usecase in the billing core returns `BillingError`. Variants carry
//! the precise cause for logs; `kind()` collapses them into the closed
//! `ErrorKind` set the HTTP boundary switches on.
//!
//! # Kind Mapping
//!
//! | Kind | HTTP Status |
//! |------|-------------|
//! | NotFound | 404 |
//! | InvalidInput | 400 |
//! | Conflict | 409 |
//! | Unauthorized | 401 |
//! | Forbidden | 403 |
//! | RateLimited | 429 |
//! | UpstreamGateway | 502 |
//! | Internal | 500 |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Coarse error category used for transport mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Conflict,
    Unauthorized,
    Forbidden,
    Internal,
    RateLimited,
    UpstreamGateway,
}

/// Errors produced by billing usecases and access-control decisions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    #[error("Tenant not found")]
    TenantNotFound,

    #[error("License key not found")]
    LicenseKeyNotFound,

    #[error("Entitlement not found")]
    EntitlementNotFound,

    #[error("Subscription not found")]
    SubscriptionNotFound,

    #[error("{0} not found")]
    ResourceNotFound(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("License key has already been claimed")]
    LicenseKeyAlreadyClaimed,

    #[error("License key is not claimable in status {status}")]
    LicenseKeyNotClaimable { status: String },

    #[error("License key has expired")]
    LicenseKeyExpired,

    #[error("License key is already revoked")]
    LicenseKeyAlreadyRevoked,

    #[error("Entitlement is already revoked")]
    EntitlementAlreadyRevoked,

    #[error("Invalid tenant status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Access has been revoked")]
    AccessRevoked,

    #[error("Tenant is in grace period (read-only)")]
    GracePeriodReadOnly,

    #[error("Tenant payment is pending (read-only)")]
    PaymentPendingReadOnly,

    #[error("Tenant is suspended")]
    TenantSuspended,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Missing webhook signature")]
    MissingSignature,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid webhook payload: {0}")]
    InvalidWebhookPayload(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Billing provider error: {0}")]
    Upstream(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl BillingError {
    /// Creates a validation error for a specific input field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        BillingError::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the coarse category for this error.
    pub fn kind(&self) -> ErrorKind {
        use BillingError::*;
        match self {
            TenantNotFound
            | LicenseKeyNotFound
            | EntitlementNotFound
            | SubscriptionNotFound
            | ResourceNotFound(_) => ErrorKind::NotFound,

            Validation { .. }
            | LicenseKeyExpired
            | MissingSignature
            | InvalidWebhookPayload(_) => ErrorKind::InvalidInput,

            LicenseKeyAlreadyClaimed
            | LicenseKeyNotClaimable { .. }
            | LicenseKeyAlreadyRevoked
            | EntitlementAlreadyRevoked
            | InvalidTransition { .. } => ErrorKind::Conflict,

            Unauthenticated | InvalidSignature => ErrorKind::Unauthorized,

            AccessRevoked | GracePeriodReadOnly | PaymentPendingReadOnly | TenantSuspended => {
                ErrorKind::Forbidden
            }

            RateLimited => ErrorKind::RateLimited,
            Upstream(_) => ErrorKind::UpstreamGateway,
            Infrastructure(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        use BillingError::*;
        match self {
            TenantNotFound => "ERR_TENANT_NOT_FOUND",
            LicenseKeyNotFound => "ERR_LICENSE_KEY_NOT_FOUND",
            EntitlementNotFound => "ERR_ENTITLEMENT_NOT_FOUND",
            SubscriptionNotFound => "ERR_SUBSCRIPTION_NOT_FOUND",
            ResourceNotFound(_) => "ERR_NOT_FOUND",
            Validation { .. } => "ERR_VALIDATION",
            LicenseKeyAlreadyClaimed => "ERR_LICENSE_KEY_ALREADY_CLAIMED",
            LicenseKeyNotClaimable { .. } => "ERR_LICENSE_KEY_NOT_CLAIMABLE",
            LicenseKeyExpired => "ERR_LICENSE_KEY_EXPIRED",
            LicenseKeyAlreadyRevoked => "ERR_LICENSE_KEY_ALREADY_REVOKED",
            EntitlementAlreadyRevoked => "ERR_ENTITLEMENT_ALREADY_REVOKED",
            InvalidTransition { .. } => "ERR_INVALID_STATUS_TRANSITION",
            AccessRevoked => "ERR_ACCESS_REVOKED",
            GracePeriodReadOnly => "ERR_GRACE_PERIOD_READ_ONLY",
            PaymentPendingReadOnly => "ERR_PAYMENT_PENDING_READ_ONLY",
            TenantSuspended => "ERR_TENANT_SUSPENDED",
            Unauthenticated => "ERR_UNAUTHENTICATED",
            MissingSignature => "ERR_MISSING_SIGNATURE",
            InvalidSignature => "ERR_INVALID_SIGNATURE",
            InvalidWebhookPayload(_) => "ERR_INVALID_PAYLOAD",
            RateLimited => "ERR_RATE_LIMITED",
            Upstream(_) => "ERR_UPSTREAM_GATEWAY",
            Infrastructure(_) => "ERR_INTERNAL",
        }
    }

    /// Returns true if the billing provider should redeliver a webhook that
    /// failed with this error.
    ///
    /// Malformed payloads never become valid on retry; everything else might.
    pub fn is_retryable(&self) -> bool {
        self.kind() != ErrorKind::InvalidInput
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::NotFound => BillingError::ResourceNotFound(err.message),
            ErrorCode::ValidationFailed => BillingError::Validation {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "input".to_string()),
                message: err.message,
            },
            ErrorCode::InvalidStateTransition => BillingError::InvalidTransition {
                from: err.details.get("from").cloned().unwrap_or_default(),
                to: err.details.get("to").cloned().unwrap_or_default(),
            },
            ErrorCode::AlreadyExists | ErrorCode::DatabaseError | ErrorCode::InternalError => {
                BillingError::Infrastructure(err.to_string())
            }
        }
    }
}
