//! Flash-sale ("seckill") voucher purchases.
//!
//! A purchase is checked optimistically against the voucher row, then serialized per
//! user with the distributed lock `order:<user>`. Inside the lock a single relational
//! transaction re-checks one-order-per-user, decrements stock with a `stock > 0` guard
//! and inserts the order. The unique `(user_id, voucher_id)` constraint backs up the
//! lock when it expires mid-flight.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::application::repos::{RepoError, SeckillRepo};
use crate::cache::keys::{ORDER_ID_PREFIX, order_lock_resource};
use crate::cache::{KvError, KvStore};
use crate::coordination::{DistributedLock, IdError, IdWorker};
use crate::domain::entities::NewVoucherOrder;
use crate::domain::types::OrderStatus;

const METRIC_ORDER: &str = "flashsale_seckill_order_total";
const METRIC_REJECTED: &str = "flashsale_seckill_rejected_total";

pub const DEFAULT_ORDER_LOCK_TIMEOUT: Duration = Duration::from_secs(1200);

#[derive(Debug, Error)]
pub enum SeckillError {
    #[error("voucher {voucher_id} not found")]
    VoucherNotFound { voucher_id: i64 },
    #[error("voucher {voucher_id} is not on sale")]
    OutsideSalesWindow { voucher_id: i64 },
    #[error("voucher {voucher_id} is out of stock")]
    OutOfStock { voucher_id: i64 },
    #[error("user {user_id} already has an order in progress")]
    OrderInProgress { user_id: i64 },
    #[error("user {user_id} already bought voucher {voucher_id}")]
    DuplicatePurchase { user_id: i64, voucher_id: i64 },
    #[error("order id generation failed")]
    IdGeneration(#[source] IdError),
    #[error("order lock store failed")]
    Lock(#[source] KvError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl SeckillError {
    /// Message suitable for the buyer; never exposes store details.
    pub fn reason(&self) -> &'static str {
        match self {
            SeckillError::VoucherNotFound { .. } => "voucher does not exist",
            SeckillError::OutsideSalesWindow { .. } => "sale has not started or has already ended",
            SeckillError::OutOfStock { .. } => "out of stock",
            SeckillError::OrderInProgress { .. } => {
                "an order for this user is already being placed"
            }
            SeckillError::DuplicatePurchase { .. } => "each user may buy this voucher only once",
            SeckillError::IdGeneration(_) | SeckillError::Lock(_) | SeckillError::Repo(_) => {
                "order could not be placed, please retry"
            }
        }
    }

    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SeckillError::VoucherNotFound { .. } => "voucher_not_found",
            SeckillError::OutsideSalesWindow { .. } => "outside_sales_window",
            SeckillError::OutOfStock { .. } => "out_of_stock",
            SeckillError::OrderInProgress { .. } => "order_in_progress",
            SeckillError::DuplicatePurchase { .. } => "duplicate_purchase",
            SeckillError::IdGeneration(_) => "id_generation",
            SeckillError::Lock(_) => "lock",
            SeckillError::Repo(_) => "repo",
        }
    }

    /// Store or database failure, as opposed to a business rejection.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            SeckillError::IdGeneration(_) | SeckillError::Lock(_) | SeckillError::Repo(_)
        )
    }
}

#[derive(Clone)]
pub struct SeckillService {
    repo: Arc<dyn SeckillRepo>,
    lock: DistributedLock,
    ids: IdWorker,
    order_lock_timeout: Duration,
}

impl SeckillService {
    pub fn new(
        repo: Arc<dyn SeckillRepo>,
        store: Arc<dyn KvStore>,
        ids: IdWorker,
        order_lock_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            lock: DistributedLock::new(store),
            ids,
            order_lock_timeout,
        }
    }

    /// Place one order for `user_id`. Returns the new order id.
    #[instrument(skip(self))]
    pub async fn seckill_voucher(
        &self,
        voucher_id: i64,
        user_id: i64,
    ) -> Result<i64, SeckillError> {
        self.seckill_voucher_at(voucher_id, user_id, OffsetDateTime::now_utc())
            .await
    }

    /// Same as [`Self::seckill_voucher`] with the sales window checked against `now`.
    pub async fn seckill_voucher_at(
        &self,
        voucher_id: i64,
        user_id: i64,
        now: OffsetDateTime,
    ) -> Result<i64, SeckillError> {
        let result = self.place_order(voucher_id, user_id, now).await;
        match &result {
            Ok(order_id) => {
                counter!(METRIC_ORDER).increment(1);
                info!(voucher_id, user_id, order_id, "Voucher order placed");
            }
            Err(err) => {
                counter!(METRIC_REJECTED, "reason" => err.kind()).increment(1);
                if err.is_infrastructure() {
                    warn!(voucher_id, user_id, error = %err, "Voucher order failed");
                } else {
                    debug!(voucher_id, user_id, reason = err.kind(), "Voucher order rejected");
                }
            }
        }
        result
    }

    async fn place_order(
        &self,
        voucher_id: i64,
        user_id: i64,
        now: OffsetDateTime,
    ) -> Result<i64, SeckillError> {
        let voucher = self
            .repo
            .find_voucher(voucher_id)
            .await?
            .ok_or(SeckillError::VoucherNotFound { voucher_id })?;
        if !voucher.is_on_sale_at(now) {
            return Err(SeckillError::OutsideSalesWindow { voucher_id });
        }
        if !voucher.has_stock() {
            return Err(SeckillError::OutOfStock { voucher_id });
        }

        let guard = self
            .lock
            .try_lock(&order_lock_resource(user_id), self.order_lock_timeout)
            .await
            .map_err(SeckillError::Lock)?
            .ok_or(SeckillError::OrderInProgress { user_id })?;

        let result = self.create_voucher_order(voucher_id, user_id).await;
        guard.release().await;
        result
    }

    /// One-order-per-user check, stock decrement and insert in a single transaction.
    ///
    /// Callers must hold the user's order lock; any error rolls the transaction back.
    pub async fn create_voucher_order(
        &self,
        voucher_id: i64,
        user_id: i64,
    ) -> Result<i64, SeckillError> {
        let mut tx = self.repo.begin_order_tx().await?;

        if tx.count_orders(user_id, voucher_id).await? > 0 {
            return Err(SeckillError::DuplicatePurchase {
                user_id,
                voucher_id,
            });
        }
        if !tx.decrement_stock(voucher_id).await? {
            return Err(SeckillError::OutOfStock { voucher_id });
        }

        let order_id = self
            .ids
            .next_id(ORDER_ID_PREFIX)
            .await
            .map_err(SeckillError::IdGeneration)?;
        let order = NewVoucherOrder {
            id: order_id,
            user_id,
            voucher_id,
            status: OrderStatus::Unpaid,
        };
        match tx.insert_order(&order).await {
            Ok(()) => {}
            Err(RepoError::Duplicate { .. }) => {
                return Err(SeckillError::DuplicatePurchase {
                    user_id,
                    voucher_id,
                });
            }
            Err(err) => return Err(err.into()),
        }

        tx.commit().await?;
        Ok(order_id)
    }
}
