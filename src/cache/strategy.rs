use std::{fmt, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

/// How a cache lookup behaves on a miss or a stale entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Load on miss and cache confirmed absences as an empty sentinel.
    PassThrough,
    /// Load on miss under a distributed lock; contenders back off and retry.
    Mutex,
    /// Serve logically-expired entries and rebuild them in the background.
    LogicalExpire,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::PassThrough => "pass-through",
            Strategy::Mutex => "mutex",
            Strategy::LogicalExpire => "logical-expire",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown cache strategy `{0}` (expected pass-through, mutex or logical-expire)")]
pub struct ParseStrategyError(String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pass-through" | "passthrough" => Ok(Strategy::PassThrough),
            "mutex" => Ok(Strategy::Mutex),
            "logical-expire" | "logical" => Ok(Strategy::LogicalExpire),
            other => Err(ParseStrategyError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_and_round_trips_display() {
        for strategy in [
            Strategy::PassThrough,
            Strategy::Mutex,
            Strategy::LogicalExpire,
        ] {
            assert_eq!(strategy.to_string().parse::<Strategy>().ok(), Some(strategy));
        }
        assert_eq!("Logical".parse::<Strategy>().ok(), Some(Strategy::LogicalExpire));
        assert!("random".parse::<Strategy>().is_err());
    }
}
