//! Sliding-window rate limiting for minigame attempts that are not cooldown-gated.
//!
//! The in-memory limiter smooths out button spam from a single process. It is
//! not persisted and not shared across instances; economic correctness is the
//! job of the cooldown gate. Callers depend on the [`RateLimiter`] trait so a
//! shared backend can replace it without touching them.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Window and budget applied to rate-limited activities.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RateLimitSettings {
    pub window_ms: i64,
    pub max_hits: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_hits: 5,
        }
    }
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::milliseconds(self.window_ms.max(0))
    }
}

/// Result of a rate-limit claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Rejected; the oldest surviving hit expires in `next_in_ms`.
    Limited { next_in_ms: i64 },
}

impl RateDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

pub trait RateLimiter: Send + Sync {
    /// Record a hit on `(user_id, key)` unless `max_hits` already landed
    /// within the last `window`.
    fn claim(
        &self,
        user_id: &str,
        key: &str,
        window: Duration,
        max_hits: usize,
        now: DateTime<Utc>,
    ) -> RateDecision;

    /// Drop all tracked buckets.
    fn clear(&self);
}

type BucketKey = (String, String);

#[derive(Default)]
struct BucketTable {
    hits: HashMap<BucketKey, VecDeque<DateTime<Utc>>>,
    last_sweep: Option<DateTime<Utc>>,
}

impl BucketTable {
    /// Drop buckets whose newest hit left the window. Runs at most once per window.
    fn sweep(&mut self, window: Duration, now: DateTime<Utc>) {
        if self.last_sweep.is_some_and(|at| now - at < window) {
            return;
        }
        let cutoff = now - window;
        self.hits
            .retain(|_, hits| hits.back().is_some_and(|last| *last > cutoff));
        self.last_sweep = Some(now);
    }
}

/// Process-local limiter keyed by `(user_id, key)`.
///
/// Expired buckets are swept opportunistically from `claim`, so idle users do
/// not accumulate.
#[derive(Clone, Default)]
pub struct InMemoryRateLimiter {
    buckets: Arc<RwLock<BucketTable>>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `(user, key)` buckets currently tracked.
    pub fn tracked_buckets(&self) -> usize {
        self.buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .hits
            .len()
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn claim(
        &self,
        user_id: &str,
        key: &str,
        window: Duration,
        max_hits: usize,
        now: DateTime<Utc>,
    ) -> RateDecision {
        let mut table = self
            .buckets
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        table.sweep(window, now);

        let bucket_key = (user_id.to_string(), key.to_string());
        let hits = table.hits.entry(bucket_key.clone()).or_default();
        let cutoff = now - window;
        while hits.front().is_some_and(|hit| *hit <= cutoff) {
            hits.pop_front();
        }

        if hits.len() >= max_hits {
            let next_in_ms = hits
                .front()
                .map(|oldest| (*oldest + window - now).num_milliseconds().max(0))
                .unwrap_or(0);
            if hits.is_empty() {
                table.hits.remove(&bucket_key);
            }
            return RateDecision::Limited { next_in_ms };
        }

        hits.push_back(now);
        RateDecision::Allowed
    }

    fn clear(&self) {
        let mut table = self
            .buckets
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *table = BucketTable::default();
    }
}
