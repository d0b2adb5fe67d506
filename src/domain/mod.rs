//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `billing` - Tenant lifecycle, entitlements, license keys, webhook reconciliation inputs

pub mod billing;
pub mod foundation;
