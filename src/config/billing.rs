//! Billing policy configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Days a tenant stays in grace before suspension
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: i64,

    /// Plan granted by license keys and checkout
    #[serde(default = "default_plan_code")]
    pub default_plan_code: String,

    /// Fixed delay before answering failed public requests, in milliseconds
    #[serde(default = "default_failure_delay_ms")]
    pub failure_delay_ms: u64,

    /// Requests per window per client IP on public endpoints
    #[serde(default = "default_public_rate_limit")]
    pub public_rate_limit: usize,

    #[serde(default = "default_public_rate_window_secs")]
    pub public_rate_window_secs: u64,
}

impl BillingConfig {
    pub fn failure_delay(&self) -> Duration {
        Duration::from_millis(self.failure_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=90).contains(&self.grace_period_days) {
            return Err(ValidationError::InvalidGracePeriod);
        }
        if self.default_plan_code.trim().is_empty() {
            return Err(ValidationError::EmptyPlanCode);
        }
        if self.public_rate_limit == 0 || self.public_rate_window_secs == 0 {
            return Err(ValidationError::InvalidRateLimit);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            grace_period_days: default_grace_period_days(),
            default_plan_code: default_plan_code(),
            failure_delay_ms: default_failure_delay_ms(),
            public_rate_limit: default_public_rate_limit(),
            public_rate_window_secs: default_public_rate_window_secs(),
        }
    }
}

fn default_grace_period_days() -> i64 {
    14
}

fn default_plan_code() -> String {
    "standard".to_string()
}

fn default_failure_delay_ms() -> u64 {
    1000
}

fn default_public_rate_limit() -> usize {
    5
}

fn default_public_rate_window_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BillingConfig::default();
        assert_eq!(config.grace_period_days, 14);
        assert_eq!(config.default_plan_code, "standard");
        assert_eq!(config.failure_delay(), Duration::from_secs(1));
        assert_eq!(config.public_rate_limit, 5);
        assert_eq!(config.public_rate_window_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_grace_period_bounds() {
        for days in [0, -1, 91] {
            let config = BillingConfig {
                grace_period_days: days,
                ..Default::default()
            };
            assert_eq!(config.validate(), Err(ValidationError::InvalidGracePeriod));
        }
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let config = BillingConfig {
            public_rate_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidRateLimit));
    }
}
