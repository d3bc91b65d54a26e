//! Per-requester submission limiter.
//!
//! Counts live in a bounded in-memory cache scoped to this process; they are
//! not shared between server instances and reset on restart.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use moka::future::Cache;
use slotscrape_core::config::env_positive;
use slotscrape_core::error::AppError;
use slotscrape_core::job::Platform;

/// Upper bound on tracked requesters; the least recently used are evicted.
const MAX_TRACKED_REQUESTERS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterConfig {
    pub submissions_per_window: u32,
    pub window: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            submissions_per_window: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl LimiterConfig {
    /// - `SLOTSCRAPE_SUBMISSIONS_PER_WINDOW` (default 10)
    /// - `SLOTSCRAPE_SUBMISSION_WINDOW_SECS` (default 60)
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        let per_window = env_positive(
            "SLOTSCRAPE_SUBMISSIONS_PER_WINDOW",
            u64::from(defaults.submissions_per_window),
        )?;
        let window = env_positive(
            "SLOTSCRAPE_SUBMISSION_WINDOW_SECS",
            defaults.window.as_secs(),
        )?;

        Ok(Self {
            submissions_per_window: u32::try_from(per_window).map_err(|_| {
                AppError::ConfigError("SLOTSCRAPE_SUBMISSIONS_PER_WINDOW is too large".into())
            })?,
            window: Duration::from_secs(window),
        })
    }

    pub fn with_submissions_per_window(mut self, max: u32) -> Self {
        self.submissions_per_window = max.max(1);
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Fixed-window counter keyed by `platform:requester`.
///
/// The window starts at a requester's first submission and the entry expires
/// with it (cache time-to-live), so the next submission opens a fresh window.
#[derive(Clone)]
pub struct SubmissionLimiter {
    counts: Cache<String, Arc<AtomicU32>>,
    max_per_window: u32,
}

impl SubmissionLimiter {
    pub fn new(config: &LimiterConfig) -> Self {
        Self {
            counts: Cache::builder()
                .max_capacity(MAX_TRACKED_REQUESTERS)
                .time_to_live(config.window)
                .build(),
            max_per_window: config.submissions_per_window,
        }
    }

    /// Count one submission, failing with `RateLimitExceeded` over budget.
    pub async fn check(&self, platform: Platform, requester: &str) -> Result<(), AppError> {
        let key = format!("{platform}:{requester}");
        let counter = self
            .counts
            .get_with(key.clone(), async { Arc::new(AtomicU32::new(0)) })
            .await;

        let count = counter.fetch_add(1, Ordering::Relaxed) + 1;
        if count > self.max_per_window {
            tracing::warn!(%key, count, "Submission rate limit exceeded");
            return Err(AppError::RateLimitExceeded);
        }
        Ok(())
    }
}
