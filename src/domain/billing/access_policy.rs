//! Request-time billing access decisions.
//!
//! Two gates run on tenant routes, in this order:
//!
//! 1. The tenant status gate blocks suspended tenants outright.
//! 2. The billing guard blocks everything for tenants with a revoked
//!    entitlement, and blocks writes for tenants that are not active.
//!
//! The guard's read allowance for suspended tenants only matters on routes
//! mounted without the status gate.

use super::errors::BillingError;
use super::tenant_status::TenantStatus;

/// Read/write classification of an HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write,
}

impl OperationKind {
    /// POST, PUT, PATCH and DELETE are writes; everything else reads.
    pub fn from_method(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "POST" | "PUT" | "PATCH" | "DELETE" => OperationKind::Write,
            _ => OperationKind::Read,
        }
    }

    pub fn is_write(&self) -> bool {
        *self == OperationKind::Write
    }
}

/// Pure policy functions used by the HTTP gates.
pub struct BillingAccessPolicy;

impl BillingAccessPolicy {
    /// Any revoked entitlement is a hard stop for every method.
    pub fn check_revocation(has_revoked_entitlement: bool) -> Result<(), BillingError> {
        if has_revoked_entitlement {
            Err(BillingError::AccessRevoked)
        } else {
            Ok(())
        }
    }

    /// Status-dependent read/write decision.
    pub fn check_status(
        status: TenantStatus,
        operation: OperationKind,
    ) -> Result<(), BillingError> {
        match (status, operation) {
            (TenantStatus::Active, _) => Ok(()),
            (_, OperationKind::Read) => Ok(()),
            (TenantStatus::Grace, OperationKind::Write) => Err(BillingError::GracePeriodReadOnly),
            (TenantStatus::Suspended, OperationKind::Write) => Err(BillingError::TenantSuspended),
            (TenantStatus::PendingPayment, OperationKind::Write) => {
                Err(BillingError::PaymentPendingReadOnly)
            }
        }
    }

    /// The stricter gate: suspended tenants get nothing.
    pub fn check_tenant_status_gate(status: TenantStatus) -> Result<(), BillingError> {
        if status == TenantStatus::Suspended {
            Err(BillingError::TenantSuspended)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRITES: [&str; 4] = ["POST", "PUT", "PATCH", "DELETE"];
    const READS: [&str; 3] = ["GET", "HEAD", "OPTIONS"];

    #[test]
    fn methods_are_classified() {
        for m in WRITES {
            assert_eq!(OperationKind::from_method(m), OperationKind::Write, "{m}");
        }
        for m in READS {
            assert_eq!(OperationKind::from_method(m), OperationKind::Read, "{m}");
        }
        assert_eq!(OperationKind::from_method("post"), OperationKind::Write);
    }

    #[test]
    fn revocation_blocks_regardless_of_method() {
        assert_eq!(
            BillingAccessPolicy::check_revocation(true),
            Err(BillingError::AccessRevoked)
        );
        assert!(BillingAccessPolicy::check_revocation(false).is_ok());
    }

    #[test]
    fn active_admits_everything() {
        for m in WRITES.iter().chain(READS.iter()) {
            let op = OperationKind::from_method(m);
            assert!(BillingAccessPolicy::check_status(TenantStatus::Active, op).is_ok());
        }
    }

    #[test]
    fn grace_is_read_only() {
        assert!(
            BillingAccessPolicy::check_status(TenantStatus::Grace, OperationKind::Read).is_ok()
        );
        assert_eq!(
            BillingAccessPolicy::check_status(TenantStatus::Grace, OperationKind::Write),
            Err(BillingError::GracePeriodReadOnly)
        );
    }

    #[test]
    fn suspended_rejects_writes_in_guard() {
        assert!(
            BillingAccessPolicy::check_status(TenantStatus::Suspended, OperationKind::Read).is_ok()
        );
        assert_eq!(
            BillingAccessPolicy::check_status(TenantStatus::Suspended, OperationKind::Write),
            Err(BillingError::TenantSuspended)
        );
    }

    #[test]
    fn pending_payment_is_read_only() {
        assert!(BillingAccessPolicy::check_status(
            TenantStatus::PendingPayment,
            OperationKind::Read
        )
        .is_ok());
        assert_eq!(
            BillingAccessPolicy::check_status(TenantStatus::PendingPayment, OperationKind::Write),
            Err(BillingError::PaymentPendingReadOnly)
        );
    }

    #[test]
    fn status_gate_blocks_only_suspended() {
        assert!(BillingAccessPolicy::check_tenant_status_gate(TenantStatus::Active).is_ok());
        assert!(BillingAccessPolicy::check_tenant_status_gate(TenantStatus::Grace).is_ok());
        assert!(
            BillingAccessPolicy::check_tenant_status_gate(TenantStatus::PendingPayment).is_ok()
        );
        assert_eq!(
            BillingAccessPolicy::check_tenant_status_gate(TenantStatus::Suspended),
            Err(BillingError::TenantSuspended)
        );
    }
}
