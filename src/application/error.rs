use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{seckill::SeckillError, shops::ShopError},
    cache::CacheError,
    coordination::IdError,
    infra::error::InfraError,
};

/// Flattened view of an error and its `source()` chain, outermost first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    pub fn joined(&self) -> String {
        self.messages.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Shop(#[from] ShopError),
    #[error(transparent)]
    Seckill(#[from] SeckillError),
    #[error(transparent)]
    Id(#[from] IdError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::KvError;

    #[test]
    fn report_walks_source_chain() {
        let error = AppError::from(SeckillError::Lock(KvError::backend("connection reset")));
        let report = error.report();

        assert_eq!(
            report.messages,
            vec![
                "order lock store failed".to_string(),
                "key-value backend error: connection reset".to_string(),
            ]
        );
        assert_eq!(
            report.joined(),
            "order lock store failed: key-value backend error: connection reset"
        );
    }
}
