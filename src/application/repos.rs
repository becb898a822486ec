//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    NewVoucherOrder, SeckillVoucherRecord, ShopRecord, ShopTypeRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait ShopsRepo: Send + Sync {
    async fn find_shop(&self, id: i64) -> Result<Option<ShopRecord>, RepoError>;

    /// Overwrite the mutable columns of an existing shop. Returns false when no row
    /// carries `shop.id`.
    async fn update_shop(&self, shop: &ShopRecord) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait ShopTypesRepo: Send + Sync {
    /// All shop types ordered by `sort` ascending.
    async fn list_shop_types(&self) -> Result<Vec<ShopTypeRecord>, RepoError>;
}

#[async_trait]
pub trait SeckillRepo: Send + Sync {
    async fn find_voucher(&self, voucher_id: i64)
    -> Result<Option<SeckillVoucherRecord>, RepoError>;

    /// Open the transaction that wraps one purchase attempt.
    async fn begin_order_tx(&self) -> Result<Box<dyn OrderTransaction>, RepoError>;
}

/// One purchase attempt. Dropping without [`OrderTransaction::commit`] rolls back.
#[async_trait]
pub trait OrderTransaction: Send {
    async fn count_orders(&mut self, user_id: i64, voucher_id: i64) -> Result<i64, RepoError>;

    /// `stock = stock - 1` guarded by `stock > 0`. Returns false when nothing was left.
    async fn decrement_stock(&mut self, voucher_id: i64) -> Result<bool, RepoError>;

    async fn insert_order(&mut self, order: &NewVoucherOrder) -> Result<(), RepoError>;

    async fn commit(self: Box<Self>) -> Result<(), RepoError>;
}
