//! Tenant aggregate.
//!
//! Status changes only happen through the transition methods below, each of
//! which validates the edge against `TenantStatus`'s state machine and keeps
//! `grace_until` consistent with the status.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, TenantId, Timestamp};

use super::errors::BillingError;
use super::tenant_status::TenantStatus;

/// Longest tenant display name accepted.
pub const MAX_TENANT_NAME_LEN: usize = 100;

/// A customer organization and its billing lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    id: TenantId,
    name: String,
    status: TenantStatus,
    grace_until: Option<Timestamp>,
    pending_stripe_session_id: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Tenant {
    /// Creates an already-active tenant (license key provisioning).
    pub fn new_active(name: impl Into<String>, now: Timestamp) -> Result<Self, BillingError> {
        Self::create(name.into(), TenantStatus::Active, now)
    }

    /// Creates a tenant that waits for its first checkout to complete.
    pub fn new_pending_payment(
        name: impl Into<String>,
        now: Timestamp,
    ) -> Result<Self, BillingError> {
        Self::create(name.into(), TenantStatus::PendingPayment, now)
    }

    fn create(name: String, status: TenantStatus, now: Timestamp) -> Result<Self, BillingError> {
        let name = validate_tenant_name(&name)?;
        Ok(Self {
            id: TenantId::new(),
            name,
            status,
            grace_until: None,
            pending_stripe_session_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds a tenant from persisted state without re-validating.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: TenantId,
        name: String,
        status: TenantStatus,
        grace_until: Option<Timestamp>,
        pending_stripe_session_id: Option<String>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name,
            status,
            grace_until,
            pending_stripe_session_id,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> TenantId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> TenantStatus {
        self.status
    }

    pub fn grace_until(&self) -> Option<Timestamp> {
        self.grace_until
    }

    pub fn pending_stripe_session_id(&self) -> Option<&str> {
        self.pending_stripe_session_id.as_deref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// True once the grace deadline has passed while still in grace.
    pub fn is_grace_expired(&self, now: Timestamp) -> bool {
        self.status == TenantStatus::Grace
            && self.grace_until.map_or(true, |until| !until.is_after(&now))
    }

    /// Records the Checkout session that will complete this tenant's signup.
    pub fn attach_checkout_session(
        &mut self,
        session_id: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), BillingError> {
        if self.status != TenantStatus::PendingPayment {
            return Err(BillingError::invalid_transition(
                self.status.as_str(),
                "pending_payment",
            ));
        }
        self.pending_stripe_session_id = Some(session_id.into());
        self.updated_at = now;
        Ok(())
    }

    /// Moves the tenant to `active` after a payment signal.
    ///
    /// Valid from `pending_payment` and `grace`. Already-active tenants are
    /// left untouched and `Ok(false)` is returned. Suspended tenants are
    /// rejected: only [`Tenant::reinstate`] leaves `suspended`.
    pub fn activate(&mut self, now: Timestamp) -> Result<bool, BillingError> {
        match self.status {
            TenantStatus::Active => Ok(false),
            TenantStatus::Suspended => Err(BillingError::invalid_transition(
                self.status.as_str(),
                TenantStatus::Active.as_str(),
            )),
            TenantStatus::PendingPayment | TenantStatus::Grace => {
                self.transition(TenantStatus::Active, now)?;
                self.grace_until = None;
                self.pending_stripe_session_id = None;
                Ok(true)
            }
        }
    }

    /// Enters the grace period, ending at `until`.
    ///
    /// `until` must lie in the future relative to `now`.
    pub fn enter_grace(&mut self, until: Timestamp, now: Timestamp) -> Result<(), BillingError> {
        if !until.is_after(&now) {
            return Err(BillingError::validation(
                "grace_until",
                "grace period must end in the future",
            ));
        }
        self.transition(TenantStatus::Grace, now)?;
        self.grace_until = Some(until);
        Ok(())
    }

    /// Suspends a tenant that is currently in grace.
    pub fn suspend(&mut self, now: Timestamp) -> Result<(), BillingError> {
        self.transition(TenantStatus::Suspended, now)?;
        self.grace_until = None;
        Ok(())
    }

    /// Admin reinstatement out of `suspended`.
    pub fn reinstate(&mut self, now: Timestamp) -> Result<(), BillingError> {
        if self.status != TenantStatus::Suspended {
            return Err(BillingError::invalid_transition(
                self.status.as_str(),
                TenantStatus::Active.as_str(),
            ));
        }
        self.transition(TenantStatus::Active, now)?;
        self.grace_until = None;
        Ok(())
    }

    fn transition(&mut self, target: TenantStatus, now: Timestamp) -> Result<(), BillingError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|_| BillingError::invalid_transition(self.status.as_str(), target.as_str()))?;
        self.updated_at = now;
        Ok(())
    }
}

fn validate_tenant_name(name: &str) -> Result<String, BillingError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(BillingError::validation("tenant_name", "cannot be empty"));
    }
    if trimmed.chars().count() > MAX_TENANT_NAME_LEN {
        return Err(BillingError::validation(
            "tenant_name",
            format!("must be at most {} characters", MAX_TENANT_NAME_LEN),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_tenant() -> Tenant {
        Tenant::new_active("Night Owls Event Staff", Timestamp::now()).unwrap()
    }

    #[test]
    fn new_active_trims_name() {
        let tenant = Tenant::new_active("  Club Aurora  ", Timestamp::now()).unwrap();
        assert_eq!(tenant.name(), "Club Aurora");
        assert_eq!(tenant.status(), TenantStatus::Active);
        assert!(tenant.grace_until().is_none());
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Tenant::new_active("   ", Timestamp::now()).unwrap_err();
        assert!(matches!(
            err,
            BillingError::Validation { ref field, .. } if field == "tenant_name"
        ));
    }

    #[test]
    fn overlong_name_is_rejected() {
        let name = "x".repeat(MAX_TENANT_NAME_LEN + 1);
        assert!(Tenant::new_active(name, Timestamp::now()).is_err());
    }

    #[test]
    fn enter_grace_sets_deadline() {
        let now = Timestamp::now();
        let mut tenant = active_tenant();
        tenant.enter_grace(now.add_days(14), now).unwrap();
        assert_eq!(tenant.status(), TenantStatus::Grace);
        assert_eq!(tenant.grace_until(), Some(now.add_days(14)));
    }

    #[test]
    fn enter_grace_requires_future_deadline() {
        let now = Timestamp::now();
        let mut tenant = active_tenant();
        let err = tenant.enter_grace(now, now).unwrap_err();
        assert!(matches!(err, BillingError::Validation { .. }));
        assert_eq!(tenant.status(), TenantStatus::Active);
    }

    #[test]
    fn suspend_from_active_is_rejected() {
        let mut tenant = active_tenant();
        let err = tenant.suspend(Timestamp::now()).unwrap_err();
        assert_eq!(err, BillingError::invalid_transition("active", "suspended"));
        assert_eq!(tenant.status(), TenantStatus::Active);
    }

    #[test]
    fn suspend_from_grace_clears_deadline() {
        let now = Timestamp::now();
        let mut tenant = active_tenant();
        tenant.enter_grace(now.add_days(7), now).unwrap();
        tenant.suspend(now).unwrap();
        assert_eq!(tenant.status(), TenantStatus::Suspended);
        assert!(tenant.grace_until().is_none());
    }

    #[test]
    fn activate_recovers_from_grace() {
        let now = Timestamp::now();
        let mut tenant = active_tenant();
        tenant.enter_grace(now.add_days(7), now).unwrap();
        assert!(tenant.activate(now).unwrap());
        assert_eq!(tenant.status(), TenantStatus::Active);
        assert!(tenant.grace_until().is_none());
    }

    #[test]
    fn activate_is_noop_when_already_active() {
        let mut tenant = active_tenant();
        assert!(!tenant.activate(Timestamp::now()).unwrap());
    }

    #[test]
    fn activate_cannot_leave_suspended() {
        let now = Timestamp::now();
        let mut tenant = active_tenant();
        tenant.enter_grace(now.add_days(7), now).unwrap();
        tenant.suspend(now).unwrap();
        assert!(tenant.activate(now).is_err());
        assert_eq!(tenant.status(), TenantStatus::Suspended);
    }

    #[test]
    fn reinstate_only_from_suspended() {
        let now = Timestamp::now();
        let mut tenant = active_tenant();
        assert!(tenant.reinstate(now).is_err());

        tenant.enter_grace(now.add_days(7), now).unwrap();
        tenant.suspend(now).unwrap();
        tenant.reinstate(now).unwrap();
        assert_eq!(tenant.status(), TenantStatus::Active);
    }

    #[test]
    fn pending_tenant_activates_and_forgets_session() {
        let now = Timestamp::now();
        let mut tenant = Tenant::new_pending_payment("Shift Crew", now).unwrap();
        tenant.attach_checkout_session("cs_test_123", now).unwrap();
        assert_eq!(tenant.pending_stripe_session_id(), Some("cs_test_123"));

        tenant.activate(now).unwrap();
        assert_eq!(tenant.status(), TenantStatus::Active);
        assert!(tenant.pending_stripe_session_id().is_none());
    }

    #[test]
    fn checkout_session_only_attaches_while_pending() {
        let mut tenant = active_tenant();
        assert!(tenant
            .attach_checkout_session("cs_test_123", Timestamp::now())
            .is_err());
    }

    #[test]
    fn grace_expiry_is_inclusive_of_deadline() {
        let now = Timestamp::now();
        let mut tenant = active_tenant();
        tenant.enter_grace(now.add_days(1), now).unwrap();
        assert!(!tenant.is_grace_expired(now));
        assert!(tenant.is_grace_expired(now.add_days(1)));
        assert!(tenant.is_grace_expired(now.add_days(2)));
    }
}
