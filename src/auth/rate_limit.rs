use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::models::WindowUsage;
use crate::db::store::QueryUsageStore;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_queries: u32,
    pub window_size: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_queries: 5,
            window_size: Duration::hours(24),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub remaining: u32,
    pub used: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitStatus {
    /// `reset_at` is when the oldest in-window query falls out, freeing a
    /// slot. With nothing in the window it is just `now + window`.
    pub fn from_usage(usage: WindowUsage, now: DateTime<Utc>, config: &RateLimitConfig) -> Self {
        let used = u32::try_from(usage.count.max(0)).unwrap_or(u32::MAX);
        let reset_at = match usage.oldest {
            Some(oldest) => oldest + config.window_size,
            None => now + config.window_size,
        };

        Self {
            allowed: used < config.max_queries,
            remaining: config.max_queries.saturating_sub(used),
            used,
            reset_at,
        }
    }
}

/// Rolling-window quota over the persisted query log.
///
/// Nothing is cached in process: every check reads the store, so several
/// server instances sharing one database agree on each user's quota.
pub struct RateLimiter {
    store: Arc<dyn QueryUsageStore>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn QueryUsageStore>, config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self { store, config, clock }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub async fn check_status(&self, user_id: Uuid) -> Result<RateLimitStatus, AppError> {
        let now = self.clock.now();
        let window_start = now - self.config.window_size;

        let usage = self.store.window_usage(user_id, window_start).await?;
        let status = RateLimitStatus::from_usage(usage, now, &self.config);

        debug!(
            "Quota for user {}: {}/{} used, resets at {}",
            user_id, status.used, self.config.max_queries, status.reset_at
        );
        Ok(status)
    }

    pub async fn record_query(&self, user_id: Uuid) -> Result<(), AppError> {
        self.store.record_query(user_id, self.clock.now()).await
    }
}
