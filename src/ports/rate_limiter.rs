//! Rate limiting port for public, unauthenticated endpoints.
//!
//! Limiter state is process-local and resets on restart. It slows abuse;
//! it is not a quota.

/// Per-key admission check.
///
/// Implementations must be safe to share across request tasks.
pub trait RateLimiter: Send + Sync {
    /// Returns true and records the request if `key` is under its limit.
    fn allow(&self, key: &str) -> bool;
}
