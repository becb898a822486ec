use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use flashsale::cache::{KvStore, MemoryKvStore};
use flashsale::coordination::{DistributedLock, IdWorker, sequence_part, timestamp_part};
use time::macros::datetime;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lock_admits_one_holder_at_a_time() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let lock = DistributedLock::new(Arc::clone(&store));
    let inside = Arc::new(AtomicUsize::new(0));
    let acquired = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let lock = lock.clone();
        let inside = Arc::clone(&inside);
        let acquired = Arc::clone(&acquired);
        handles.push(tokio::spawn(async move {
            for _ in 0..20 {
                let guard = lock
                    .try_lock("order:42", Duration::from_secs(30))
                    .await
                    .expect("store");
                if let Some(guard) = guard {
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    acquired.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                    assert!(guard.release().await);
                }
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.expect("join");
    }

    assert!(acquired.load(Ordering::SeqCst) >= 1);
    assert!(store.get("lock:order:42").await.expect("get").is_none());
}

#[tokio::test]
async fn stale_guard_cannot_release_new_holder() {
    let store = Arc::new(MemoryKvStore::new());
    let lock = DistributedLock::new(store.clone());

    let first = lock
        .try_lock("order:7", Duration::from_secs(30))
        .await
        .expect("store")
        .expect("free");
    // Simulate the lease lapsing and another process taking over.
    store.delete(first.key()).await.expect("delete");
    let second = lock
        .try_lock("order:7", Duration::from_secs(30))
        .await
        .expect("store")
        .expect("free again");

    assert!(!first.release().await);
    assert_eq!(
        store.get(second.key()).await.expect("get").as_deref(),
        Some(second.token())
    );
    assert!(second.release().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_ids_are_unique() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let worker = IdWorker::new(store);
    let now = datetime!(2026-10-15 08:00:00 UTC);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let worker = worker.clone();
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::with_capacity(125);
            for _ in 0..125 {
                ids.push(worker.next_id_at("order", now).await.expect("id"));
            }
            ids
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.await.expect("join") {
            assert!(id > 0);
            assert!(seen.insert(id), "duplicate id {id}");
        }
    }
    assert_eq!(seen.len(), 1_000);

    let sequences: HashSet<i64> = seen.iter().map(|id| sequence_part(*id)).collect();
    assert_eq!(sequences, (1..=1_000).collect());
    let stamps: HashSet<i64> = seen.iter().map(|id| timestamp_part(*id)).collect();
    assert_eq!(stamps.len(), 1);
}

#[tokio::test]
async fn later_ids_sort_after_earlier_ones() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let worker = IdWorker::new(store);

    let morning = worker
        .next_id_at("order", datetime!(2026-10-15 08:00:00 UTC))
        .await
        .expect("id");
    let noon = worker
        .next_id_at("order", datetime!(2026-10-15 12:00:00 UTC))
        .await
        .expect("id");
    let next_day = worker
        .next_id_at("order", datetime!(2026-10-16 00:00:01 UTC))
        .await
        .expect("id");

    assert!(morning < noon && noon < next_day);
    assert_eq!(sequence_part(next_day), 1);
}
