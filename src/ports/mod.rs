//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing core and the outside world. Adapters implement these ports.
//!
//! ## Persistence
//!
//! - Read-only repositories (`TenantRepository`, `EntitlementRepository`, ...)
//!   serve queries and pre-transaction validation.
//! - `TransactionManager` / `BillingTransaction` carry every mutation, so a
//!   state change, its ledger row and its audit entry commit together.
//!
//! ## Services
//!
//! - `PaymentProvider` - Stripe checkout and billing portal sessions
//! - `PasswordHasher` - admin password hashing
//! - `RateLimiter` - public endpoint throttling
//! - `TenantSessionValidator`, `AdminIdentityVerifier` - trust boundaries

mod admin_repository;
mod audit_log_repository;
mod auth;
mod entitlement_repository;
mod license_key_repository;
mod pagination;
mod password_hasher;
mod payment_provider;
mod rate_limiter;
mod subscription_repository;
mod tenant_repository;
mod transaction;
mod webhook_event_repository;

pub use admin_repository::AdminRepository;
pub use audit_log_repository::{AuditLogQuery, BillingAuditLogRepository};
pub use auth::{AdminActor, AdminIdentityVerifier, AuthError, TenantContext, TenantSessionValidator};
pub use entitlement_repository::EntitlementRepository;
pub use license_key_repository::{LicenseKeyFilter, LicenseKeyRepository};
pub use pagination::{Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use password_hasher::PasswordHasher;
pub use payment_provider::{
    CheckoutSession, CreateCheckoutRequest, PaymentError, PaymentProvider, PortalSession,
};
pub use rate_limiter::RateLimiter;
pub use subscription_repository::SubscriptionRepository;
pub use tenant_repository::{TenantFilter, TenantRepository};
pub use transaction::{BillingTransaction, TransactionManager};
pub use webhook_event_repository::{SaveResult, WebhookEventRepository};
