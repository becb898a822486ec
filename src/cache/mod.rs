//! Cache-aside layer over a shared key-value store.
//!
//! Lookups go through [`CacheClient`], which picks one of three [`Strategy`] values per
//! call. Configuration comes from the `[cache]` section of `flashsale.toml`:
//!
//! ```toml
//! [cache]
//! null_ttl_seconds = 120
//! shop_ttl_seconds = 1800
//! lock_ttl_seconds = 10
//! rebuild_workers = 10
//! shop_strategy = "logical-expire"
//! # ... see config.rs for all options
//! ```

mod client;
mod config;
mod envelope;
mod error;
pub mod keys;
mod rebuild;
pub mod store;
mod strategy;

pub use client::CacheClient;
pub use config::CacheConfig;
pub use envelope::LogicalEnvelope;
pub use error::{CacheError, LoaderError};
pub use rebuild::{RebuildPool, RebuildRejected, RebuildTask};
pub use store::{KvError, KvStore, MemoryKvStore};
pub use strategy::{ParseStrategyError, Strategy};
