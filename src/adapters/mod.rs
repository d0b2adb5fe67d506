//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the billing core to external systems:
//! - `memory` - in-memory billing store for tests and local development
//! - `postgres` - sqlx billing store and migrations
//! - `stripe` - Stripe checkout and portal client, plus a mock
//! - `rate_limiter` - sliding window limiter for public endpoints
//! - `auth` - tenant JWT codec and Cloudflare Access verifier
//! - `password` - Argon2id password hashing
//! - `http` - axum routers, middleware and error mapping

pub mod auth;
pub mod http;
pub mod memory;
pub mod password;
pub mod postgres;
pub mod rate_limiter;
pub mod stripe;
