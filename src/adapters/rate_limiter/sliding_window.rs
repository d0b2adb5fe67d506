//! Sliding-window rate limiter.
//!
//! Keeps the admission instants of every key inside one mutex-guarded map.
//! A request is admitted while fewer than `limit` admissions remain inside
//! the trailing window. State is process-local.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::ports::RateLimiter;

use super::config::RateLimitPolicy;

#[derive(Debug)]
pub struct SlidingWindowRateLimiter {
    limit: usize,
    window: Duration,
    hits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl SlidingWindowRateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_policy(policy: RateLimitPolicy) -> Self {
        Self::new(policy.limit, policy.window())
    }

    /// Admission check against an explicit clock.
    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut hits = self.lock();
        let entries = hits.entry(key.to_string()).or_default();
        prune(entries, now, self.window);

        if entries.len() >= self.limit {
            return false;
        }
        entries.push(now);
        true
    }

    /// Drops every key without admissions inside the window; returns how many.
    pub fn compact_at(&self, now: Instant) -> usize {
        let mut hits = self.lock();
        let before = hits.len();
        hits.retain(|_, entries| {
            prune(entries, now, self.window);
            !entries.is_empty()
        });
        before - hits.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    /// Spawns the periodic compaction sweep.
    pub fn spawn_compaction(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.compact_at(tokio::time::Instant::now().into_std());
                if removed > 0 {
                    tracing::debug!(
                        removed,
                        remaining = limiter.tracked_keys(),
                        "Rate limiter compacted"
                    );
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Instant>>> {
        self.hits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keeps only instants strictly inside `(now - window, now]`.
fn prune(entries: &mut Vec<Instant>, now: Instant, window: Duration) {
    if let Some(cutoff) = now.checked_sub(window) {
        entries.retain(|t| *t > cutoff);
    }
}

impl RateLimiter for SlidingWindowRateLimiter {
    fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }
}
