use thiserror::Error;

use super::store::KvError;

pub type LoaderError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] KvError),
    #[error("cached value at `{key}` could not be decoded")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("value could not be encoded for the cache")]
    Serialize(#[source] serde_json::Error),
    #[error("loader failed: {0}")]
    Loader(#[source] LoaderError),
    #[error("lock for `{key}` still held after {attempts} attempts")]
    LockUnavailable { key: String, attempts: u32 },
}

impl CacheError {
    pub fn loader<E>(err: E) -> Self
    where
        E: Into<LoaderError>,
    {
        Self::Loader(err.into())
    }
}
