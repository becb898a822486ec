use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Logical-expiry wrapper stored without a physical TTL.
///
/// `expire_time` is epoch milliseconds. `data` is `null` when the last rebuild found
/// nothing in the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalEnvelope<T> {
    pub data: Option<T>,
    pub expire_time: i64,
}

impl<T> LogicalEnvelope<T> {
    pub fn new(data: Option<T>, ttl: Duration, now: OffsetDateTime) -> Self {
        Self {
            data,
            expire_time: epoch_millis(now).saturating_add(duration_millis(ttl)),
        }
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expire_time <= epoch_millis(now)
    }
}

fn epoch_millis(at: OffsetDateTime) -> i64 {
    i64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_boundary_is_exclusive() {
        let now = OffsetDateTime::now_utc();
        let envelope = LogicalEnvelope::new(Some(1_u8), Duration::from_secs(10), now);

        assert!(!envelope.is_expired_at(now));
        assert!(!envelope.is_expired_at(now + time::Duration::seconds(9)));
        assert!(envelope.is_expired_at(now + time::Duration::seconds(10)));
    }

    #[test]
    fn oversized_ttl_saturates_instead_of_wrapping() {
        let now = OffsetDateTime::now_utc();
        let envelope = LogicalEnvelope::new(Some(1_u8), Duration::MAX, now);

        assert_eq!(envelope.expire_time, i64::MAX);
        assert!(!envelope.is_expired_at(now));
        assert!(epoch_millis(now) > 0);
    }

    #[test]
    fn wire_shape_uses_camel_case_fields() {
        let envelope = LogicalEnvelope {
            data: Some("x"),
            expire_time: 42,
        };
        let json = serde_json::to_string(&envelope).expect("serialize");
        assert_eq!(json, r#"{"data":"x","expireTime":42}"#);
    }
}
