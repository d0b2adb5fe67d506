//! Rate limit policies for public endpoints.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Window length of the public endpoint policies.
pub const PUBLIC_WINDOW_SECS: u64 = 60;

/// Requests per window and client IP on public endpoints.
pub const PUBLIC_REQUESTS_PER_WINDOW: usize = 5;

/// How often idle keys are swept from a limiter.
pub const COMPACTION_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// One sliding-window limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Maximum admitted requests inside one window.
    pub limit: usize,
    pub window_secs: u64,
}

impl RateLimitPolicy {
    pub fn new(limit: usize, window_secs: u64) -> Self {
        Self { limit, window_secs }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Policies applied to the unauthenticated endpoints, keyed by client IP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicEndpointPolicies {
    /// `POST /api/v1/public/license/claim`
    pub license_claim: RateLimitPolicy,
    /// `POST /api/v1/public/subscribe`
    pub subscribe: RateLimitPolicy,
}

impl PublicEndpointPolicies {
    /// Same limit for every public endpoint.
    pub fn uniform(policy: RateLimitPolicy) -> Self {
        Self {
            license_claim: policy,
            subscribe: policy,
        }
    }
}

impl Default for PublicEndpointPolicies {
    fn default() -> Self {
        Self::uniform(RateLimitPolicy::new(
            PUBLIC_REQUESTS_PER_WINDOW,
            PUBLIC_WINDOW_SECS,
        ))
    }
}
