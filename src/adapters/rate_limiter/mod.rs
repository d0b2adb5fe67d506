//! Rate limiter adapters.
//!
//! `SlidingWindowRateLimiter` implements the `RateLimiter` port in process.
//! One instance exists per public endpoint policy, keyed by client IP.
//!
//! ```ignore
//! let limiter = Arc::new(SlidingWindowRateLimiter::from_policy(policies.license_claim));
//! limiter.spawn_compaction(COMPACTION_INTERVAL);
//! ```

mod config;
mod sliding_window;

pub use config::{
    PublicEndpointPolicies, RateLimitPolicy, COMPACTION_INTERVAL, PUBLIC_REQUESTS_PER_WINDOW,
    PUBLIC_WINDOW_SECS,
};
pub use sliding_window::SlidingWindowRateLimiter;
