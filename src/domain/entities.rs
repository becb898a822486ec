//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::OrderStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopRecord {
    pub id: i64,
    pub name: String,
    pub type_id: i64,
    pub images: String,
    pub area: Option<String>,
    pub address: String,
    pub x: f64,
    pub y: f64,
    /// Average spend per visit, in cents.
    pub avg_price: Option<i64>,
    pub sold: i32,
    pub comments: i32,
    /// Rating multiplied by ten (1..=50).
    pub score: i32,
    pub open_hours: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopTypeRecord {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub sort: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeckillVoucherRecord {
    pub voucher_id: i64,
    pub stock: i32,
    pub begin_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl SeckillVoucherRecord {
    /// Whether `now` falls inside the inclusive sales window.
    pub fn is_on_sale_at(&self, now: OffsetDateTime) -> bool {
        self.begin_time <= now && now <= self.end_time
    }

    pub fn has_stock(&self) -> bool {
        self.stock > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherOrderRecord {
    pub id: i64,
    pub user_id: i64,
    pub voucher_id: i64,
    pub status: OrderStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Order row about to be inserted inside the purchase transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVoucherOrder {
    pub id: i64,
    pub user_id: i64,
    pub voucher_id: i64,
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn sales_window_is_inclusive() {
        let voucher = SeckillVoucherRecord {
            voucher_id: 1,
            stock: 0,
            begin_time: datetime!(2026-10-15 10:00:00 UTC),
            end_time: datetime!(2026-10-15 12:00:00 UTC),
            created_at: datetime!(2026-10-01 00:00:00 UTC),
            updated_at: datetime!(2026-10-01 00:00:00 UTC),
        };

        assert!(!voucher.is_on_sale_at(datetime!(2026-10-15 09:59:59 UTC)));
        assert!(voucher.is_on_sale_at(datetime!(2026-10-15 10:00:00 UTC)));
        assert!(voucher.is_on_sale_at(datetime!(2026-10-15 12:00:00 UTC)));
        assert!(!voucher.is_on_sale_at(datetime!(2026-10-15 12:00:01 UTC)));
        assert!(!voucher.has_stock());
    }
}
