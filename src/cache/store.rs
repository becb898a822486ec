//! Key-value store seam.
//!
//! [`KvStore`] is the set of atomic primitives the cache engine, the distributed lock
//! and the ID generator are written against. [`MemoryKvStore`] keeps everything in
//! process (tests, single-node runs); the Redis adapter lives in `infra::redis`.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("key-value backend error: {0}")]
    Backend(String),
    #[error("key-value connection pool error: {0}")]
    Pool(String),
    #[error("value stored at `{key}` is invalid: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl KvError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }

    pub fn pool(err: impl std::fmt::Display) -> Self {
        Self::Pool(err.to_string())
    }
}

/// Atomic primitives against a shared key-value store.
///
/// Every method is a single round-trip. Values are UTF-8 strings; an empty string is a
/// legal value and is used by the cache engine as a "confirmed absent" sentinel.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Overwrite `key`. `None` stores without a physical TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), KvError>;

    /// Store `value` only if `key` does not exist. Returns whether the write happened.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
    -> Result<bool, KvError>;

    async fn delete(&self, key: &str) -> Result<bool, KvError>;

    /// Delete `key` only if it currently holds `expected`, as one atomic step.
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, KvError>;

    /// Atomically increment the integer counter at `key`, creating it at 1.
    async fn increment(&self, key: &str) -> Result<i64, KvError>;

    /// Set a physical TTL on an existing key. Returns false when the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KvError>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn new(value: &str, ttl: Option<Duration>) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| deadline > now)
    }
}

/// In-process [`KvStore`].
///
/// Expiry is evaluated lazily on access against the Tokio clock, so paused-time tests
/// can advance past TTLs without sleeping.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: DashMap<String, MemoryEntry>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining physical TTL of a live key; `None` for missing keys and keys without TTL.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .and_then(|entry| entry.expires_at)
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| entry.value().is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let now = Instant::now();
        let value = self
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone());
        if value.is_none() {
            self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), KvError> {
        self.entries
            .insert(key.to_string(), MemoryEntry::new(value, ttl));
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, KvError> {
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    return Ok(false);
                }
                occupied.insert(MemoryEntry::new(value, Some(ttl)));
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(MemoryEntry::new(value, Some(ttl)));
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, KvError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| entry.is_live(now)))
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, KvError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove_if(key, |_, entry| entry.is_live(now) && entry.value == expected)
            .is_some())
    }

    async fn increment(&self, key: &str) -> Result<i64, KvError> {
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_live(now) {
                    occupied.insert(MemoryEntry::new("1", None));
                    return Ok(1);
                }
                let entry = occupied.get_mut();
                let current: i64 = entry.value.parse().map_err(|_| KvError::InvalidValue {
                    key: key.to_string(),
                    reason: "value is not an integer".to_string(),
                })?;
                let next = current.checked_add(1).ok_or_else(|| KvError::InvalidValue {
                    key: key.to_string(),
                    reason: "increment would overflow".to_string(),
                })?;
                entry.value = next.to_string();
                Ok(next)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(MemoryEntry::new("1", None));
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KvError> {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if entry.is_live(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ttl_expiry_hides_and_reaps_keys() {
        let store = MemoryKvStore::new();
        store
            .set("k", "v", Some(Duration::from_secs(5)))
            .await
            .expect("set");

        assert_eq!(store.get("k").await.expect("get").as_deref(), Some("v"));
        assert_eq!(store.ttl("k"), Some(Duration::from_secs(5)));

        tokio::time::advance(Duration::from_secs(6)).await;

        assert!(store.get("k").await.expect("get").is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_if_absent_respects_live_keys_only() {
        let store = MemoryKvStore::new();
        let ttl = Duration::from_secs(1);

        assert!(store.set_if_absent("lock", "a", ttl).await.expect("nx"));
        assert!(!store.set_if_absent("lock", "b", ttl).await.expect("nx"));

        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(store.set_if_absent("lock", "b", ttl).await.expect("nx"));
        assert_eq!(store.get("lock").await.expect("get").as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn delete_if_equals_only_removes_matching_value() {
        let store = MemoryKvStore::new();
        store.set("k", "owner", None).await.expect("set");

        assert!(!store.delete_if_equals("k", "intruder").await.expect("cad"));
        assert!(store.get("k").await.expect("get").is_some());

        assert!(store.delete_if_equals("k", "owner").await.expect("cad"));
        assert!(store.get("k").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn increment_creates_and_rejects_non_integers() {
        let store = MemoryKvStore::new();
        assert_eq!(store.increment("c").await.expect("incr"), 1);
        assert_eq!(store.increment("c").await.expect("incr"), 2);

        store.set("text", "abc", None).await.expect("set");
        let err = store.increment("text").await.expect_err("not an integer");
        assert!(matches!(err, KvError::InvalidValue { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn increment_keeps_existing_ttl() {
        let store = MemoryKvStore::new();
        store.increment("c").await.expect("incr");
        assert!(
            store
                .expire("c", Duration::from_secs(10))
                .await
                .expect("expire")
        );

        store.increment("c").await.expect("incr");
        assert_eq!(store.ttl("c"), Some(Duration::from_secs(10)));
        assert!(!store.expire("missing", Duration::from_secs(1)).await.expect("expire"));
    }
}
