use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;

use crate::{
    application::repos::{OrderTransaction, RepoError, SeckillRepo},
    domain::entities::{NewVoucherOrder, SeckillVoucherRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SeckillVoucherRow {
    voucher_id: i64,
    stock: i32,
    begin_time: OffsetDateTime,
    end_time: OffsetDateTime,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<SeckillVoucherRow> for SeckillVoucherRecord {
    fn from(row: SeckillVoucherRow) -> Self {
        Self {
            voucher_id: row.voucher_id,
            stock: row.stock,
            begin_time: row.begin_time,
            end_time: row.end_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl SeckillRepo for PostgresRepositories {
    async fn find_voucher(
        &self,
        voucher_id: i64,
    ) -> Result<Option<SeckillVoucherRecord>, RepoError> {
        let row = sqlx::query_as::<_, SeckillVoucherRow>(
            r#"
            SELECT voucher_id, stock, begin_time, end_time, created_at, updated_at
            FROM tb_seckill_voucher
            WHERE voucher_id = $1
            "#,
        )
        .bind(voucher_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SeckillVoucherRecord::from))
    }

    async fn begin_order_tx(&self) -> Result<Box<dyn OrderTransaction>, RepoError> {
        let tx = self.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(PgOrderTransaction { tx }))
    }
}

/// Purchase transaction on a pooled connection; rolled back when dropped uncommitted.
pub struct PgOrderTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderTransaction for PgOrderTransaction {
    async fn count_orders(&mut self, user_id: i64, voucher_id: i64) -> Result<i64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM tb_voucher_order
            WHERE user_id = $1 AND voucher_id = $2
            "#,
        )
        .bind(user_id)
        .bind(voucher_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(count)
    }

    async fn decrement_stock(&mut self, voucher_id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE tb_seckill_voucher
            SET stock = stock - 1,
                updated_at = now()
            WHERE voucher_id = $1 AND stock > 0
            "#,
        )
        .bind(voucher_id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_order(&mut self, order: &NewVoucherOrder) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO tb_voucher_order (id, user_id, voucher_id, status)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.voucher_id)
        .bind(order.status)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }
}
