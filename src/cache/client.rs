//! Cache-aside engine.
//!
//! Reads go to the shared store first and fall back to a caller-supplied loader. Three
//! strategies trade freshness against load on the source of truth:
//!
//! - [`Strategy::PassThrough`]: load on miss; confirmed absences are cached as an empty
//!   sentinel for `null_ttl` so repeated lookups of missing ids stay off the database.
//! - [`Strategy::Mutex`]: like pass-through, but only the holder of
//!   `lock:<prefix><id>` loads. Everyone else backs off and retries a bounded number of
//!   times.
//! - [`Strategy::LogicalExpire`]: entries carry their own `expireTime` and never vanish
//!   from the store. Stale entries are served immediately while one caller schedules a
//!   rebuild on the [`RebuildPool`].

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::coordination::{DistributedLock, LockGuard};

use super::config::CacheConfig;
use super::envelope::LogicalEnvelope;
use super::error::{CacheError, LoaderError};
use super::rebuild::RebuildPool;
use super::store::KvStore;
use super::strategy::Strategy;

const METRIC_HIT: &str = "flashsale_cache_hit_total";
const METRIC_MISS: &str = "flashsale_cache_miss_total";
const METRIC_NULL_HIT: &str = "flashsale_cache_null_hit_total";
const METRIC_STALE: &str = "flashsale_cache_stale_total";
const METRIC_REBUILD: &str = "flashsale_cache_rebuild_total";
const METRIC_REBUILD_FAILED: &str = "flashsale_cache_rebuild_failed_total";
const METRIC_LOCK_CONTENDED: &str = "flashsale_lock_contended_total";

/// Result of reading a plain (non-envelope) entry.
enum Lookup<T> {
    Hit(T),
    /// Empty sentinel: the source of truth confirmed the id does not exist.
    Absent,
    Miss,
}

#[derive(Clone)]
pub struct CacheClient {
    store: Arc<dyn KvStore>,
    lock: DistributedLock,
    rebuilds: Arc<RebuildPool>,
    config: CacheConfig,
}

impl CacheClient {
    /// Build a client with its own rebuild pool. Must run inside a Tokio runtime.
    pub fn new(store: Arc<dyn KvStore>, config: CacheConfig) -> Self {
        let rebuilds = Arc::new(RebuildPool::new(
            config.rebuild_workers_non_zero(),
            config.rebuild_queue_capacity_non_zero(),
        ));
        Self::with_rebuild_pool(store, config, rebuilds)
    }

    pub fn with_rebuild_pool(
        store: Arc<dyn KvStore>,
        config: CacheConfig,
        rebuilds: Arc<RebuildPool>,
    ) -> Self {
        Self {
            lock: DistributedLock::new(Arc::clone(&store)),
            store,
            rebuilds,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Wait for every scheduled rebuild to finish and stop accepting new ones.
    ///
    /// Short-lived processes call this before the runtime exits so queued rebuilds are
    /// written and their locks released. Stale lookups afterwards are still served but
    /// their rebuilds are dropped.
    pub async fn shutdown(&self) {
        self.rebuilds.shutdown().await;
    }

    /// Serialize `value` and store it with a physical TTL.
    pub async fn set<T>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_string(value).map_err(CacheError::Serialize)?;
        self.store.set(key, &payload, ttl).await?;
        Ok(())
    }

    /// Store `value` in a logical-expiry envelope without a physical TTL.
    pub async fn set_with_logical_expire<T>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let payload = encode_envelope(Some(value), ttl)?;
        self.store.set(key, &payload, None).await?;
        Ok(())
    }

    /// Read a plain entry. The empty sentinel reads as `None`.
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned,
    {
        match self.lookup(key).await? {
            Lookup::Hit(value) => Ok(Some(value)),
            Lookup::Absent | Lookup::Miss => Ok(None),
        }
    }

    pub async fn invalidate(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self.store.delete(key).await?;
        debug!(key, removed, "Cache entry invalidated");
        Ok(removed)
    }

    /// Dispatch to the lookup selected by `strategy`.
    pub async fn resolve<ID, T, F, Fut, E>(
        &self,
        key_prefix: &str,
        id: ID,
        loader: F,
        ttl: Duration,
        strategy: Strategy,
    ) -> Result<Option<T>, CacheError>
    where
        ID: Display + Send + 'static,
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce(ID) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
        E: Into<LoaderError> + Send + 'static,
    {
        match strategy {
            Strategy::PassThrough => {
                self.query_with_pass_through(key_prefix, id, loader, ttl)
                    .await
            }
            Strategy::Mutex => self.query_with_mutex(key_prefix, id, loader, ttl).await,
            Strategy::LogicalExpire => {
                self.query_with_logical_expire(key_prefix, id, loader, ttl)
                    .await
            }
        }
    }

    #[instrument(skip(self, id, loader), fields(strategy = "pass-through"))]
    pub async fn query_with_pass_through<ID, T, F, Fut, E>(
        &self,
        key_prefix: &str,
        id: ID,
        loader: F,
        ttl: Duration,
    ) -> Result<Option<T>, CacheError>
    where
        ID: Display,
        T: Serialize + DeserializeOwned,
        F: FnOnce(ID) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Into<LoaderError>,
    {
        let key = format!("{key_prefix}{id}");
        match self.lookup_counted(&key, Strategy::PassThrough).await? {
            Lookup::Hit(value) => Ok(Some(value)),
            Lookup::Absent => Ok(None),
            Lookup::Miss => {
                counter!(METRIC_MISS, "strategy" => Strategy::PassThrough.as_str()).increment(1);
                self.load_and_store(&key, id, loader, ttl).await
            }
        }
    }

    #[instrument(skip(self, id, loader), fields(strategy = "mutex"))]
    pub async fn query_with_mutex<ID, T, F, Fut, E>(
        &self,
        key_prefix: &str,
        id: ID,
        loader: F,
        ttl: Duration,
    ) -> Result<Option<T>, CacheError>
    where
        ID: Display,
        T: Serialize + DeserializeOwned,
        F: FnOnce(ID) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Into<LoaderError>,
    {
        let key = format!("{key_prefix}{id}");
        let max_attempts = self.config.mutex_max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.lookup_counted(&key, Strategy::Mutex).await? {
                Lookup::Hit(value) => return Ok(Some(value)),
                Lookup::Absent => return Ok(None),
                Lookup::Miss => {}
            }
            if attempt == 1 {
                counter!(METRIC_MISS, "strategy" => Strategy::Mutex.as_str()).increment(1);
            }

            if let Some(guard) = self.lock.try_lock(&key, self.config.lock_ttl).await? {
                let result = self.load_under_lock(&key, id, loader, ttl).await;
                guard.release().await;
                return result;
            }

            counter!(METRIC_LOCK_CONTENDED, "strategy" => Strategy::Mutex.as_str()).increment(1);
            if attempt < max_attempts {
                let delay = self.config.mutex_backoff(attempt);
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                debug!(key = %key, attempt, delay_ms, "Rebuild lock busy; backing off");
                tokio::time::sleep(delay).await;
            }
        }

        warn!(key = %key, attempts = max_attempts, "Gave up waiting for rebuild lock");
        Err(CacheError::LockUnavailable {
            key,
            attempts: max_attempts,
        })
    }

    /// Serve from a logical-expiry envelope, scheduling a rebuild when it is stale.
    ///
    /// A missing envelope is `Ok(None)`: these entries are expected to be pre-warmed.
    #[instrument(skip(self, id, loader), fields(strategy = "logical-expire"))]
    pub async fn query_with_logical_expire<ID, T, F, Fut, E>(
        &self,
        key_prefix: &str,
        id: ID,
        loader: F,
        ttl: Duration,
    ) -> Result<Option<T>, CacheError>
    where
        ID: Display + Send + 'static,
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce(ID) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
        E: Into<LoaderError> + Send + 'static,
    {
        let strategy = Strategy::LogicalExpire.as_str();
        let key = format!("{key_prefix}{id}");

        let Some(envelope) = self.read_envelope::<T>(&key).await? else {
            counter!(METRIC_MISS, "strategy" => strategy).increment(1);
            debug!(key = %key, "No logical entry; not warmed");
            return Ok(None);
        };
        if !envelope.is_expired_at(OffsetDateTime::now_utc()) {
            counter!(METRIC_HIT, "strategy" => strategy).increment(1);
            return Ok(envelope.data);
        }

        counter!(METRIC_STALE, "strategy" => strategy).increment(1);
        let guard = match self.lock.try_lock(&key, self.config.lock_ttl).await {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                counter!(METRIC_LOCK_CONTENDED, "strategy" => strategy).increment(1);
                debug!(key = %key, "Rebuild already in progress; serving stale entry");
                return Ok(envelope.data);
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Rebuild lock unavailable; serving stale entry");
                return Ok(envelope.data);
            }
        };

        // Another caller may have finished a rebuild between our read and the lock.
        if let Ok(Some(current)) = self.read_envelope::<T>(&key).await
            && !current.is_expired_at(OffsetDateTime::now_utc())
        {
            guard.release().await;
            return Ok(current.data);
        }

        self.schedule_rebuild(key, id, loader, ttl, guard);
        Ok(envelope.data)
    }

    fn schedule_rebuild<ID, T, F, Fut, E>(
        &self,
        key: String,
        id: ID,
        loader: F,
        ttl: Duration,
        guard: LockGuard,
    ) where
        ID: Send + 'static,
        T: Serialize + Send + 'static,
        F: FnOnce(ID) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
        E: Into<LoaderError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task_key = key.clone();
        let task = async move {
            let key = task_key;
            let outcome = match loader(id).await {
                Ok(data) => {
                    let encoded = encode_envelope(data.as_ref(), ttl);
                    match encoded {
                        Ok(payload) => store
                            .set(&key, &payload, None)
                            .await
                            .map_err(CacheError::from),
                        Err(err) => Err(err),
                    }
                }
                Err(err) => Err(CacheError::loader(err)),
            };
            match outcome {
                Ok(()) => {
                    counter!(METRIC_REBUILD, "strategy" => Strategy::LogicalExpire.as_str())
                        .increment(1);
                    info!(key = %key, "Logical entry rebuilt");
                }
                Err(err) => {
                    counter!(METRIC_REBUILD_FAILED, "strategy" => Strategy::LogicalExpire.as_str())
                        .increment(1);
                    warn!(
                        key = %key,
                        error = %err,
                        "Logical entry rebuild failed; stale entry kept"
                    );
                }
            }
            guard.release().await;
        };

        if let Err(rejected) = self.rebuilds.submit(Box::pin(task)) {
            counter!(METRIC_REBUILD_FAILED, "strategy" => Strategy::LogicalExpire.as_str())
                .increment(1);
            warn!(key = %key, error = %rejected, "Rebuild not scheduled");
        } else {
            debug!(key = %key, "Rebuild scheduled");
        }
    }

    async fn load_under_lock<ID, T, F, Fut, E>(
        &self,
        key: &str,
        id: ID,
        loader: F,
        ttl: Duration,
    ) -> Result<Option<T>, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(ID) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Into<LoaderError>,
    {
        match self.lookup(key).await? {
            Lookup::Hit(value) => return Ok(Some(value)),
            Lookup::Absent => return Ok(None),
            Lookup::Miss => {}
        }
        self.load_and_store(key, id, loader, ttl).await
    }

    async fn load_and_store<ID, T, F, Fut, E>(
        &self,
        key: &str,
        id: ID,
        loader: F,
        ttl: Duration,
    ) -> Result<Option<T>, CacheError>
    where
        T: Serialize,
        F: FnOnce(ID) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Into<LoaderError>,
    {
        match loader(id).await.map_err(CacheError::loader)? {
            Some(value) => {
                self.set(key, &value, Some(ttl)).await?;
                debug!(key, "Loaded and cached");
                Ok(Some(value))
            }
            None => {
                self.store.set(key, "", Some(self.config.null_ttl)).await?;
                debug!(key, "Source has no entry; cached absence");
                Ok(None)
            }
        }
    }

    async fn lookup_counted<T>(
        &self,
        key: &str,
        strategy: Strategy,
    ) -> Result<Lookup<T>, CacheError>
    where
        T: DeserializeOwned,
    {
        let lookup = self.lookup(key).await?;
        match &lookup {
            Lookup::Hit(_) => counter!(METRIC_HIT, "strategy" => strategy.as_str()).increment(1),
            Lookup::Absent => {
                counter!(METRIC_NULL_HIT, "strategy" => strategy.as_str()).increment(1)
            }
            Lookup::Miss => {}
        }
        Ok(lookup)
    }

    async fn lookup<T>(&self, key: &str) -> Result<Lookup<T>, CacheError>
    where
        T: DeserializeOwned,
    {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(Lookup::Miss);
        };
        if raw.trim().is_empty() {
            return Ok(Lookup::Absent);
        }
        serde_json::from_str(&raw)
            .map(Lookup::Hit)
            .map_err(|source| CacheError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    async fn read_envelope<T>(&self, key: &str) -> Result<Option<LogicalEnvelope<T>>, CacheError>
    where
        T: DeserializeOwned,
    {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                key: key.to_string(),
                source,
            })
    }
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("config", &self.config)
            .field("rebuilds", &self.rebuilds)
            .finish_non_exhaustive()
    }
}

fn encode_envelope<T>(data: Option<&T>, ttl: Duration) -> Result<String, CacheError>
where
    T: Serialize,
{
    let envelope = LogicalEnvelope::new(data, ttl, OffsetDateTime::now_utc());
    serde_json::to_string(&envelope).map_err(CacheError::Serialize)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::Deserialize;
    use tokio::sync::Notify;

    use super::*;
    use crate::cache::store::MemoryKvStore;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: i64,
        name: String,
    }

    fn item(id: i64) -> Item {
        Item {
            id,
            name: format!("item-{id}"),
        }
    }

    fn client() -> (CacheClient, Arc<MemoryKvStore>) {
        let store = Arc::new(MemoryKvStore::new());
        let client = CacheClient::new(store.clone(), CacheConfig::default());
        (client, store)
    }

    async fn wait_for_free_lock(store: &MemoryKvStore, key: &str) {
        for _ in 0..100 {
            if store.get(key).await.expect("get").is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("lock {key} was never released");
    }

    #[tokio::test(start_paused = true)]
    async fn pass_through_caches_value_and_absence() {
        let (client, store) = client();
        let ttl = Duration::from_secs(60);

        let found: Option<Item> = client
            .query_with_pass_through(
                "item:",
                1_i64,
                |id| async move { Ok::<_, std::io::Error>(Some(item(id))) },
                ttl,
            )
            .await
            .expect("query");
        assert_eq!(found, Some(item(1)));
        assert_eq!(store.ttl("item:1"), Some(ttl));

        let missing: Option<Item> = client
            .query_with_pass_through(
                "item:",
                2_i64,
                |_| async { Ok::<_, std::io::Error>(None) },
                ttl,
            )
            .await
            .expect("query");
        assert!(missing.is_none());
        assert_eq!(store.get("item:2").await.expect("get").as_deref(), Some(""));
        assert_eq!(store.ttl("item:2"), Some(client.config().null_ttl));
    }

    #[tokio::test]
    async fn corrupt_plain_entry_is_an_error() {
        let (client, store) = client();
        store.set("item:9", "{not json", None).await.expect("set");

        let err = client
            .query_with_pass_through(
                "item:",
                9_i64,
                |_| async { Ok::<Option<Item>, std::io::Error>(None) },
                Duration::from_secs(60),
            )
            .await
            .expect_err("corrupt");
        assert!(matches!(err, CacheError::Corrupt { ref key, .. } if key == "item:9"));
    }

    #[tokio::test]
    async fn mutex_releases_lock_when_loader_fails() {
        let (client, store) = client();

        let err = client
            .query_with_mutex(
                "item:",
                3_i64,
                |_| async { Err::<Option<Item>, _>(std::io::Error::other("db down")) },
                Duration::from_secs(60),
            )
            .await
            .expect_err("loader failure");
        assert!(matches!(err, CacheError::Loader(_)));
        assert!(store.get("lock:item:3").await.expect("get").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn mutex_gives_up_after_max_attempts() {
        let store = Arc::new(MemoryKvStore::new());
        let config = CacheConfig {
            mutex_max_attempts: 3,
            ..Default::default()
        };
        let client = CacheClient::new(store.clone(), config);
        store
            .set("lock:item:4", "someone-else", Some(Duration::from_secs(3600)))
            .await
            .expect("set");

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let err = client
            .query_with_mutex(
                "item:",
                4_i64,
                move |id| async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::io::Error>(Some(item(id)))
                },
                Duration::from_secs(60),
            )
            .await
            .expect_err("lock never freed");

        assert!(matches!(err, CacheError::LockUnavailable { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn logical_expire_miss_does_not_load() {
        let (client, _) = client();
        let found: Option<Item> = client
            .query_with_logical_expire(
                "item:",
                5_i64,
                |_| async { Err::<Option<Item>, _>(std::io::Error::other("must not be called")) },
                Duration::from_secs(60),
            )
            .await
            .expect("query");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn logical_expire_fresh_entry_is_served() {
        let (client, _) = client();
        client
            .set_with_logical_expire("item:6", &item(6), Duration::from_secs(60))
            .await
            .expect("warm");

        let found: Option<Item> = client
            .query_with_logical_expire(
                "item:",
                6_i64,
                |_| async { Err::<Option<Item>, _>(std::io::Error::other("must not be called")) },
                Duration::from_secs(60),
            )
            .await
            .expect("query");
        assert_eq!(found, Some(item(6)));
    }

    #[tokio::test]
    async fn corrupt_envelope_is_an_error() {
        let (client, store) = client();
        store.set("item:7", r#"{"data":1}"#, None).await.expect("set");

        let err = client
            .query_with_logical_expire(
                "item:",
                7_i64,
                |_| async { Ok::<Option<Item>, std::io::Error>(None) },
                Duration::from_secs(60),
            )
            .await
            .expect_err("corrupt");
        assert!(matches!(err, CacheError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn logical_rebuild_failure_keeps_stale_and_frees_lock() {
        let (client, store) = client();
        client
            .set_with_logical_expire("item:10", &item(10), Duration::ZERO)
            .await
            .expect("warm");
        let stale = store.get("item:10").await.expect("get");

        let served: Option<Item> = client
            .query_with_logical_expire(
                "item:",
                10_i64,
                |_| async { Err::<Option<Item>, _>(std::io::Error::other("db down")) },
                Duration::from_secs(60),
            )
            .await
            .expect("stale entry served");
        assert_eq!(served, Some(item(10)));

        client.shutdown().await;
        assert!(store.get("lock:item:10").await.expect("get").is_none());
        assert_eq!(store.get("item:10").await.expect("get"), stale);
    }

    #[tokio::test]
    async fn shutdown_waits_for_scheduled_rebuild() {
        let (client, store) = client();
        client
            .set_with_logical_expire("item:11", &item(11), Duration::ZERO)
            .await
            .expect("warm");

        let served: Option<Item> = client
            .query_with_logical_expire(
                "item:",
                11_i64,
                |id| async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, std::io::Error>(Some(Item {
                        id,
                        name: "rebuilt".to_string(),
                    }))
                },
                Duration::from_secs(60),
            )
            .await
            .expect("stale entry served");
        assert_eq!(served, Some(item(11)));

        client.shutdown().await;
        assert!(store.get("lock:item:11").await.expect("get").is_none());
        let envelope: LogicalEnvelope<Item> =
            serde_json::from_str(&store.get("item:11").await.expect("get").expect("entry"))
                .expect("envelope");
        assert_eq!(envelope.data.as_ref().map(|item| item.name.as_str()).as_deref(), Some("rebuilt"));
        assert!(!envelope.is_expired_at(OffsetDateTime::now_utc()));
    }

    #[tokio::test]
    async fn rejected_rebuild_releases_lock_and_serves_stale() {
        let store = Arc::new(MemoryKvStore::new());
        let rebuilds = Arc::new(RebuildPool::new(1, 1));
        let client =
            CacheClient::with_rebuild_pool(store.clone(), CacheConfig::default(), rebuilds.clone());

        // Occupy the only worker and the only queue slot.
        let gate = Arc::new(Notify::new());
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let blocker = Arc::clone(&gate);
        rebuilds
            .submit(Box::pin(async move {
                let _ = started_tx.send(());
                blocker.notified().await;
            }))
            .expect("occupy worker");
        started_rx.await.expect("worker busy");
        rebuilds.submit(Box::pin(async {})).expect("fill queue");

        client
            .set_with_logical_expire("item:12", &item(12), Duration::ZERO)
            .await
            .expect("warm");
        let served: Option<Item> = client
            .query_with_logical_expire(
                "item:",
                12_i64,
                |id| async move { Ok::<_, std::io::Error>(Some(item(id))) },
                Duration::from_secs(60),
            )
            .await
            .expect("stale entry served");
        assert_eq!(served, Some(item(12)));

        wait_for_free_lock(&store, "lock:item:12").await;
        gate.notify_one();
        rebuilds.shutdown().await;
    }

    #[tokio::test]
    async fn get_and_invalidate_plain_entries() {
        let (client, _) = client();
        client
            .set("item:8", &item(8), Some(Duration::from_secs(60)))
            .await
            .expect("set");

        assert_eq!(client.get::<Item>("item:8").await.expect("get"), Some(item(8)));
        assert!(client.invalidate("item:8").await.expect("invalidate"));
        assert_eq!(client.get::<Item>("item:8").await.expect("get"), None);
    }
}
