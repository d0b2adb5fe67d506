//! Tenant lifecycle status state machine.
//!
//! ```text
//! pending_payment ──► active ──► grace ──► suspended
//!                       ▲          │           │
//!                       └──────────┘           │
//!                       ▲   (admin reinstate)  │
//!                       └──────────────────────┘
//! ```
//!
//! `active → suspended` is deliberately absent: a tenant always passes
//! through `grace` first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, ValidationError};

/// Billing lifecycle status of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    /// Paid up (or license-key provisioned). Full access.
    Active,

    /// Payment failed; read-only until `grace_until`.
    Grace,

    /// Grace expired or subscription cancelled. Only an admin can reinstate.
    Suspended,

    /// Created through the subscribe flow, awaiting the first checkout.
    PendingPayment,
}

impl TenantStatus {
    /// Returns the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Grace => "grace",
            TenantStatus::Suspended => "suspended",
            TenantStatus::PendingPayment => "pending_payment",
        }
    }
}

impl fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TenantStatus::Active),
            "grace" => Ok(TenantStatus::Grace),
            "suspended" => Ok(TenantStatus::Suspended),
            "pending_payment" => Ok(TenantStatus::PendingPayment),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown tenant status '{}'", other),
            )),
        }
    }
}

impl StateMachine for TenantStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TenantStatus::*;
        matches!(
            (self, target),
            (PendingPayment, Active)
                | (Active, Grace)
                | (Grace, Active)
                | (Grace, Suspended)
                | (Suspended, Active)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TenantStatus::*;
        match self {
            PendingPayment => vec![Active],
            Active => vec![Grace],
            Grace => vec![Active, Suspended],
            Suspended => vec![Active],
        }
    }
}
