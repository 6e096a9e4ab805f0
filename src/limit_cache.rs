//! A bounded in-memory cache of budget limits keyed by user and category.
//!
//! The cache saves a database read on every expense write. It is not
//! authoritative: the budget limit table is, and every limit write refreshes
//! the cache while the database lock is still held.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use rust_decimal::Decimal;

use crate::{category::CategoryName, user::UserID};

/// The default max number of cached limits.
pub const DEFAULT_LIMIT_CACHE_CAPACITY: usize = 10_000;

/// The default time a cached limit stays valid.
pub const DEFAULT_LIMIT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

type CacheKey = (UserID, CategoryName);

#[derive(Debug)]
struct CacheEntry {
    limit: Decimal,
    inserted_at: Instant,
    last_used: u64,
}

#[derive(Debug, Default)]
struct CacheEntries {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Keys ordered by their `last_used` tick, oldest first.
    ///
    /// Holds exactly one tick per entry in `entries`.
    recency: BTreeMap<u64, CacheKey>,
    /// Monotonic counter used to order entries by recency.
    clock: u64,
}

impl CacheEntries {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn insert(&mut self, key: CacheKey, limit: Decimal) {
        let now = self.tick();
        self.recency.insert(now, key.clone());

        let previous = self.entries.insert(
            key,
            CacheEntry {
                limit,
                inserted_at: Instant::now(),
                last_used: now,
            },
        );

        if let Some(previous) = previous {
            self.recency.remove(&previous.last_used);
        }
    }

    fn touch(&mut self, key: &CacheKey) -> Option<Decimal> {
        let now = self.tick();
        let entry = self.entries.get_mut(key)?;
        let last_used = std::mem::replace(&mut entry.last_used, now);
        let limit = entry.limit;

        self.recency.remove(&last_used);
        self.recency.insert(now, key.clone());

        Some(limit)
    }

    fn remove(&mut self, key: &CacheKey) {
        if let Some(entry) = self.entries.remove(key) {
            self.recency.remove(&entry.last_used);
        }
    }

    fn evict_least_recently_used(&mut self) {
        if let Some((_, key)) = self.recency.pop_first() {
            tracing::debug!("evicting limit for user {} and category {}", key.0, key.1);
            self.entries.remove(&key);
        }
    }
}

/// Maps `(user, category)` to the last known budget limit.
///
/// Entries expire after `ttl` and the least recently used entry is evicted
/// once `capacity` entries are stored. A capacity of zero disables caching.
#[derive(Debug)]
pub struct LimitCache {
    capacity: usize,
    ttl: Duration,
    entries: Mutex<CacheEntries>,
}

impl LimitCache {
    /// Create an empty cache.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: Mutex::new(CacheEntries::default()),
        }
    }

    /// Get the cached limit for `user_id` and `category`, if it has not expired.
    pub fn get(&self, user_id: UserID, category: &CategoryName) -> Option<Decimal> {
        let mut cache = self.lock();
        let key = (user_id, category.clone());

        let is_expired = cache
            .entries
            .get(&key)
            .map(|entry| entry.inserted_at.elapsed() >= self.ttl)?;

        if is_expired {
            cache.remove(&key);
            return None;
        }

        cache.touch(&key)
    }

    /// Store `limit` for `user_id` and `category`, replacing any previous value.
    pub fn set(&self, user_id: UserID, category: CategoryName, limit: Decimal) {
        if self.capacity == 0 {
            return;
        }

        let mut cache = self.lock();
        let key = (user_id, category);

        if !cache.entries.contains_key(&key) && cache.entries.len() >= self.capacity {
            cache.evict_least_recently_used();
        }

        cache.insert(key, limit);
    }

    /// Remove the cached limit for `user_id` and `category`.
    pub fn invalidate(&self, user_id: UserID, category: &CategoryName) {
        self.lock().remove(&(user_id, category.clone()));
    }

    /// The number of cached entries, including any that have expired but not been read since.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The entries are plain values, so a panic while the lock was held cannot
    // leave them half-updated.
    fn lock(&self) -> MutexGuard<'_, CacheEntries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LimitCache {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT_CACHE_CAPACITY, DEFAULT_LIMIT_CACHE_TTL)
    }
}
