//! Settings for budget enforcement.

use std::time::Duration;

use crate::{
    alert::DEFAULT_NOTIFY_TIMEOUT,
    limit_cache::{DEFAULT_LIMIT_CACHE_CAPACITY, DEFAULT_LIMIT_CACHE_TTL},
};

/// Controls the limit cache and how long to wait on the alert notifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnforcerConfig {
    /// The max number of `(user, category)` limits to keep in memory.
    /// Zero disables the cache.
    pub limit_cache_capacity: usize,
    /// How long a cached limit stays valid.
    pub limit_cache_ttl: Duration,
    /// How long to wait for the notifier to deliver an alert.
    pub notify_timeout: Duration,
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self {
            limit_cache_capacity: DEFAULT_LIMIT_CACHE_CAPACITY,
            limit_cache_ttl: DEFAULT_LIMIT_CACHE_TTL,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }
}
