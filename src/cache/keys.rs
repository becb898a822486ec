//! Key layout shared by every process that talks to the store.
//!
//! All cooperating processes must agree on these prefixes; changing one orphans the
//! data written under the old name.

/// Plain or logical-expiry shop entries: `cache:shop:<id>`.
pub const CACHE_SHOP_KEY: &str = "cache:shop:";
/// Shop type list: `cache:shop-type:<scope>`.
pub const CACHE_SHOP_TYPE_KEY: &str = "cache:shop-type:";
/// Prefix applied by the distributed lock to every resource name.
pub const LOCK_KEY_PREFIX: &str = "lock:";
/// Daily ID sequence counters: `seq:<prefix>:<yyyy:MM:dd>`.
pub const SEQUENCE_KEY_PREFIX: &str = "seq:";
/// Lock resource serializing one user's purchase attempts: `order:<user>`.
pub const ORDER_LOCK_PREFIX: &str = "order:";
/// ID generator prefix for voucher orders.
pub const ORDER_ID_PREFIX: &str = "order";

pub fn lock_key(resource: &str) -> String {
    format!("{LOCK_KEY_PREFIX}{resource}")
}

pub fn sequence_key(prefix: &str, date: &str) -> String {
    format!("{SEQUENCE_KEY_PREFIX}{prefix}:{date}")
}

pub fn shop_key(id: i64) -> String {
    format!("{CACHE_SHOP_KEY}{id}")
}

pub fn order_lock_resource(user_id: i64) -> String {
    format!("{ORDER_LOCK_PREFIX}{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_expected_layout() {
        assert_eq!(shop_key(7), "cache:shop:7");
        assert_eq!(lock_key(&shop_key(7)), "lock:cache:shop:7");
        assert_eq!(lock_key(&order_lock_resource(42)), "lock:order:42");
        assert_eq!(sequence_key(ORDER_ID_PREFIX, "2026:10:15"), "seq:order:2026:10:15");
    }
}
