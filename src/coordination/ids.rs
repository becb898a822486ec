//! Globally unique 64-bit IDs.
//!
//! Layout: the high 32 bits are whole seconds since a configurable epoch, the low 32
//! bits are a per-prefix, per-UTC-day sequence from the shared store. IDs for one
//! prefix are unique across processes and increase with time.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::cache::keys::sequence_key;
use crate::cache::store::{KvError, KvStore};

/// 2025-10-24T15:00:06Z.
pub const DEFAULT_EPOCH_START: i64 = 1_761_318_006;

const COUNT_BITS: u32 = 32;
const SEQUENCE_KEY_TTL: Duration = Duration::from_secs(48 * 60 * 60);

#[derive(Debug, Error)]
pub enum IdError {
    #[error("sequence store error: {0}")]
    Store(#[from] KvError),
    #[error("clock is outside the representable range: {seconds}s since epoch")]
    Clock { seconds: i64 },
    #[error("daily sequence for `{prefix}` exhausted")]
    SequenceExhausted { prefix: String },
}

#[derive(Clone)]
pub struct IdWorker {
    store: Arc<dyn KvStore>,
    epoch_start: i64,
}

impl IdWorker {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_epoch(store, DEFAULT_EPOCH_START)
    }

    pub fn with_epoch(store: Arc<dyn KvStore>, epoch_start: i64) -> Self {
        Self { store, epoch_start }
    }

    pub fn epoch_start(&self) -> i64 {
        self.epoch_start
    }

    pub async fn next_id(&self, prefix: &str) -> Result<i64, IdError> {
        self.next_id_at(prefix, OffsetDateTime::now_utc()).await
    }

    /// Generate an ID as if the clock read `now`.
    pub async fn next_id_at(&self, prefix: &str, now: OffsetDateTime) -> Result<i64, IdError> {
        let seconds = now.unix_timestamp() - self.epoch_start;
        if !(0..(1_i64 << 31)).contains(&seconds) {
            warn!(prefix, seconds, "Clock outside ID range");
            return Err(IdError::Clock { seconds });
        }

        let key = sequence_key(prefix, &day_stamp(now));
        let sequence = self.store.increment(&key).await?;
        if sequence == 1
            && let Err(err) = self.store.expire(&key, SEQUENCE_KEY_TTL).await
        {
            // The counter is still valid; only its cleanup is lost.
            warn!(key = %key, error = %err, "Failed to set sequence TTL");
        }
        if sequence < 1 || sequence > i64::from(u32::MAX) {
            return Err(IdError::SequenceExhausted {
                prefix: prefix.to_string(),
            });
        }

        let id = (seconds << COUNT_BITS) | sequence;
        debug!(prefix, id, "Generated id");
        Ok(id)
    }
}

impl std::fmt::Debug for IdWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdWorker")
            .field("epoch_start", &self.epoch_start)
            .finish_non_exhaustive()
    }
}

/// `yyyy:MM:dd` of `now` in UTC.
fn day_stamp(now: OffsetDateTime) -> String {
    let date = now.to_offset(time::UtcOffset::UTC).date();
    format!(
        "{:04}:{:02}:{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Seconds-since-epoch half of an ID.
pub fn timestamp_part(id: i64) -> i64 {
    id >> COUNT_BITS
}

/// Sequence half of an ID.
pub fn sequence_part(id: i64) -> i64 {
    id & i64::from(u32::MAX)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use time::macros::datetime;

    use super::*;
    use crate::cache::store::MemoryKvStore;

    fn worker() -> (IdWorker, Arc<MemoryKvStore>) {
        let store = Arc::new(MemoryKvStore::new());
        (IdWorker::new(store.clone()), store)
    }

    #[tokio::test]
    async fn composes_timestamp_and_sequence() {
        let (worker, store) = worker();
        let now = datetime!(2026-10-15 12:00:00 UTC);

        let first = worker.next_id_at("order", now).await.expect("id");
        let second = worker.next_id_at("order", now).await.expect("id");

        let seconds = now.unix_timestamp() - DEFAULT_EPOCH_START;
        assert_eq!(timestamp_part(first), seconds);
        assert_eq!(sequence_part(first), 1);
        assert_eq!(sequence_part(second), 2);
        assert!(second > first);
        assert_eq!(
            store.get("seq:order:2026:10:15").await.expect("get").as_deref(),
            Some("2")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_sequence_of_day_gets_ttl() {
        let (worker, store) = worker();
        worker
            .next_id_at("order", datetime!(2026-10-15 00:00:01 UTC))
            .await
            .expect("id");
        assert_eq!(store.ttl("seq:order:2026:10:15"), Some(SEQUENCE_KEY_TTL));
    }

    #[tokio::test]
    async fn day_boundary_uses_utc_and_stays_monotonic() {
        let (worker, _) = worker();
        let late = datetime!(2026-10-15 23:59:59 UTC);
        let early = datetime!(2026-10-16 00:00:00 UTC);

        let a = worker.next_id_at("order", late).await.expect("id");
        let b = worker.next_id_at("order", late).await.expect("id");
        let c = worker.next_id_at("order", early).await.expect("id");

        assert_eq!(sequence_part(c), 1);
        assert!(a < b && b < c);

        let shifted = datetime!(2026-10-16 01:00:00 +02:00);
        let d = worker.next_id_at("order", shifted).await.expect("id");
        assert_eq!(sequence_part(d), 3, "same UTC day as `late`");
    }

    #[tokio::test]
    async fn clock_before_epoch_is_rejected() {
        let (worker, _) = worker();
        let err = worker
            .next_id_at("order", datetime!(2020-01-01 00:00:00 UTC))
            .await
            .expect_err("before epoch");
        assert!(matches!(err, IdError::Clock { .. }));
    }

    #[tokio::test]
    async fn exhausted_sequence_is_an_error() {
        let (worker, store) = worker();
        let now = datetime!(2026-10-15 12:00:00 UTC);
        store
            .set("seq:order:2026:10:15", &u32::MAX.to_string(), None)
            .await
            .expect("set");

        let err = worker.next_id_at("order", now).await.expect_err("exhausted");
        assert!(matches!(err, IdError::SequenceExhausted { .. }));
    }

    #[tokio::test]
    async fn concurrent_callers_get_distinct_ids() {
        let (worker, _) = worker();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let worker = worker.clone();
            handles.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                for _ in 0..50 {
                    ids.push(worker.next_id("order").await.expect("id"));
                }
                ids
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.await.expect("join") {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
