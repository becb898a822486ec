//! Cache engine configuration.
//!
//! Built from the `[cache]` section of `flashsale.toml`; the defaults match a single
//! Redis deployment fronting Postgres.

use std::time::Duration;

use super::strategy::Strategy;

const DEFAULT_NULL_TTL: Duration = Duration::from_secs(2 * 60);
const DEFAULT_SHOP_TTL: Duration = Duration::from_secs(30 * 60);
const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(10);
const DEFAULT_REBUILD_WORKERS: usize = 10;
const DEFAULT_REBUILD_QUEUE_CAPACITY: usize = 256;
const DEFAULT_MUTEX_MAX_ATTEMPTS: u32 = 20;
const DEFAULT_MUTEX_BACKOFF_BASE: Duration = Duration::from_millis(50);
const DEFAULT_MUTEX_BACKOFF_MAX: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Physical TTL of the empty "confirmed absent" sentinel.
    pub null_ttl: Duration,
    /// TTL (physical or logical) applied to shop entries.
    pub shop_ttl: Duration,
    /// TTL of the rebuild / recompute locks taken by the engine.
    pub lock_ttl: Duration,
    /// Fixed number of background rebuild workers.
    pub rebuild_workers: usize,
    /// Pending rebuild tasks accepted before submissions are rejected.
    pub rebuild_queue_capacity: usize,
    /// Lookups attempted by the mutex strategy before giving up.
    pub mutex_max_attempts: u32,
    /// First backoff delay of the mutex strategy; doubled on every retry.
    pub mutex_backoff_base: Duration,
    /// Ceiling for the mutex strategy backoff.
    pub mutex_backoff_max: Duration,
    /// Strategy used by shop lookups when the caller does not pick one.
    pub shop_strategy: Strategy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            null_ttl: DEFAULT_NULL_TTL,
            shop_ttl: DEFAULT_SHOP_TTL,
            lock_ttl: DEFAULT_LOCK_TTL,
            rebuild_workers: DEFAULT_REBUILD_WORKERS,
            rebuild_queue_capacity: DEFAULT_REBUILD_QUEUE_CAPACITY,
            mutex_max_attempts: DEFAULT_MUTEX_MAX_ATTEMPTS,
            mutex_backoff_base: DEFAULT_MUTEX_BACKOFF_BASE,
            mutex_backoff_max: DEFAULT_MUTEX_BACKOFF_MAX,
            shop_strategy: Strategy::LogicalExpire,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            null_ttl: settings.null_ttl,
            shop_ttl: settings.shop_ttl,
            lock_ttl: settings.lock_ttl,
            rebuild_workers: settings.rebuild_workers.get() as usize,
            rebuild_queue_capacity: settings.rebuild_queue_capacity.get() as usize,
            mutex_max_attempts: settings.mutex_max_attempts.get(),
            mutex_backoff_base: settings.mutex_backoff_base,
            mutex_backoff_max: settings.mutex_backoff_max,
            shop_strategy: settings.shop_strategy,
        }
    }
}

impl CacheConfig {
    /// Delay before retry number `attempt` (1-based) of the mutex strategy.
    pub fn mutex_backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.mutex_backoff_base
            .saturating_mul(factor)
            .min(self.mutex_backoff_max)
    }

    /// Number of workers, clamped to at least one.
    pub fn rebuild_workers_non_zero(&self) -> usize {
        self.rebuild_workers.max(1)
    }

    /// Queue capacity, clamped to at least one.
    pub fn rebuild_queue_capacity_non_zero(&self) -> usize {
        self.rebuild_queue_capacity.max(1)
    }
}
