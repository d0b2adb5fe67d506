//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, the state machine trait and the
//! error types used by every other domain module.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AdminId, AuditLogId, EntitlementId, LicenseKeyId, SubscriptionId, TenantId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
