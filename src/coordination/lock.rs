//! Distributed mutual exclusion over the shared key-value store.
//!
//! A lock is the key `lock:<resource>` holding the owner's token, written with
//! set-if-absent plus a TTL. Release is a compare-and-delete, so an owner whose lock
//! already expired can never remove somebody else's.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use once_cell::sync::Lazy;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::keys::lock_key;
use crate::cache::store::{KvError, KvStore};

static PROCESS_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().simple().to_string());
static ACQUISITIONS: AtomicU64 = AtomicU64::new(0);

/// Owner token unique across processes and across acquisitions within one process.
fn next_token() -> String {
    let sequence = ACQUISITIONS.fetch_add(1, Ordering::Relaxed);
    format!("{}-{sequence}", PROCESS_ID.as_str())
}

#[derive(Clone)]
pub struct DistributedLock {
    store: Arc<dyn KvStore>,
}

impl DistributedLock {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Try once to take `resource` for `timeout`.
    ///
    /// Returns `Ok(None)` when another owner holds it. The guard releases on drop if
    /// [`LockGuard::release`] was not called.
    pub async fn try_lock(
        &self,
        resource: &str,
        timeout: Duration,
    ) -> Result<Option<LockGuard>, KvError> {
        let key = lock_key(resource);
        let token = next_token();
        if self.store.set_if_absent(&key, &token, timeout).await? {
            debug!(lock = %key, "Lock acquired");
            Ok(Some(LockGuard {
                store: Arc::clone(&self.store),
                key,
                token,
                released: false,
            }))
        } else {
            debug!(lock = %key, "Lock held elsewhere");
            Ok(None)
        }
    }
}

impl std::fmt::Debug for DistributedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedLock").finish_non_exhaustive()
    }
}

/// A held lock. Releasing removes the key only while it still carries this token.
#[must_use = "dropping the guard releases the lock"]
pub struct LockGuard {
    store: Arc<dyn KvStore>,
    key: String,
    token: String,
    released: bool,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Release now. Returns whether this owner's key was removed; `false` means it had
    /// already expired or been taken over. Store failures are logged and reported as
    /// `false`, the TTL reclaims the key.
    pub async fn release(mut self) -> bool {
        self.released = true;
        match self.store.delete_if_equals(&self.key, &self.token).await {
            Ok(removed) => {
                if !removed {
                    debug!(lock = %self.key, "Lock already expired or taken over");
                }
                removed
            }
            Err(err) => {
                warn!(lock = %self.key, error = %err, "Failed to release lock");
                false
            }
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let store = Arc::clone(&self.store);
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = store.delete_if_equals(&key, &token).await {
                        warn!(lock = %key, error = %err, "Failed to release dropped lock");
                    }
                });
            }
            Err(_) => {
                warn!(lock = %key, "Lock dropped outside a runtime; left to expire");
            }
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("key", &self.key)
            .field("token", &self.token)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryKvStore;

    fn lock_with_store() -> (DistributedLock, Arc<MemoryKvStore>) {
        let store = Arc::new(MemoryKvStore::new());
        (DistributedLock::new(store.clone()), store)
    }

    #[tokio::test]
    async fn second_owner_is_refused_until_release() {
        let (lock, _) = lock_with_store();
        let ttl = Duration::from_secs(10);

        let guard = lock.try_lock("r", ttl).await.expect("store").expect("free");
        assert!(lock.try_lock("r", ttl).await.expect("store").is_none());

        assert!(guard.release().await);
        let again = lock.try_lock("r", ttl).await.expect("store");
        assert!(again.is_some());
    }

    #[tokio::test]
    async fn tokens_are_unique_per_acquisition() {
        let (lock, _) = lock_with_store();
        let ttl = Duration::from_secs(10);
        let a = lock.try_lock("a", ttl).await.expect("store").expect("free");
        let b = lock.try_lock("b", ttl).await.expect("store").expect("free");
        assert_ne!(a.token(), b.token());
        assert_eq!(a.key(), "lock:a");
    }

    #[tokio::test(start_paused = true)]
    async fn expired_owner_cannot_delete_new_owner() {
        let (lock, store) = lock_with_store();

        let stale = lock
            .try_lock("r", Duration::from_secs(1))
            .await
            .expect("store")
            .expect("free");
        tokio::time::advance(Duration::from_secs(2)).await;

        let fresh = lock
            .try_lock("r", Duration::from_secs(10))
            .await
            .expect("store")
            .expect("expired lock is free");

        assert!(!stale.release().await);
        assert_eq!(
            store.get("lock:r").await.expect("get").as_deref(),
            Some(fresh.token())
        );
    }

    #[tokio::test]
    async fn dropping_guard_releases() {
        let (lock, store) = lock_with_store();
        {
            let _guard = lock
                .try_lock("r", Duration::from_secs(10))
                .await
                .expect("store")
                .expect("free");
        }
        for _ in 0..10 {
            if store.get("lock:r").await.expect("get").is_none() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("dropped guard did not release the lock");
    }
}
