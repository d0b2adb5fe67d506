//! VRCShift billing core.
//!
//! Tenant billing lifecycle, license key provisioning, Stripe webhook
//! reconciliation and the request-time access gates for the VRChat shift
//! scheduling service.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
