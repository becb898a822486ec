//! Cross-process coordination on top of the shared key-value store.

mod ids;
mod lock;

pub use ids::{DEFAULT_EPOCH_START, IdError, IdWorker, sequence_part, timestamp_part};
pub use lock::{DistributedLock, LockGuard};
