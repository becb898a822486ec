//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::Strategy;
use crate::coordination::DEFAULT_EPOCH_START;

mod cli;

pub use cli::{
    CliArgs, Command, MigrateArgs, NextIdArgs, RuntimeOverrides, SeckillArgs, ShopArgs,
    ShopTypesArgs, WarmShopArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "flashsale";
const ENV_PREFIX: &str = "FLASHSALE";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_REDIS_POOL_SIZE: u32 = 16;
const DEFAULT_NULL_TTL_SECS: u64 = 2 * 60;
const DEFAULT_SHOP_TTL_SECS: u64 = 30 * 60;
const DEFAULT_LOCK_TTL_SECS: u64 = 10;
const DEFAULT_REBUILD_WORKERS: u32 = 10;
const DEFAULT_REBUILD_QUEUE_CAPACITY: u32 = 256;
const DEFAULT_MUTEX_MAX_ATTEMPTS: u32 = 20;
const DEFAULT_MUTEX_BACKOFF_BASE_MS: u64 = 50;
const DEFAULT_MUTEX_BACKOFF_MAX_MS: u64 = 1_000;
const DEFAULT_ORDER_LOCK_TIMEOUT_SECS: u64 = 1_200;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub cache: CacheSettings,
    pub seckill: SeckillSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct RedisSettings {
    pub url: String,
    pub pool_size: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub null_ttl: Duration,
    pub shop_ttl: Duration,
    pub lock_ttl: Duration,
    pub rebuild_workers: NonZeroU32,
    pub rebuild_queue_capacity: NonZeroU32,
    pub mutex_max_attempts: NonZeroU32,
    pub mutex_backoff_base: Duration,
    pub mutex_backoff_max: Duration,
    pub shop_strategy: Strategy,
}

#[derive(Debug, Clone)]
pub struct SeckillSettings {
    pub order_lock_timeout: Duration,
    pub id_epoch_start: i64,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_runtime_overrides(cli.command.overrides());

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    redis: RawRedisSettings,
    cache: RawCacheSettings,
    seckill: RawSeckillSettings,
}

impl RawSettings {
    fn apply_runtime_overrides(&mut self, overrides: &RuntimeOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(url) = overrides.redis_url.as_ref() {
            self.redis.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            redis,
            cache,
            seckill,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            redis: build_redis_settings(redis)?,
            cache: build_cache_settings(cache)?,
            seckill: build_seckill_settings(seckill)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_blank(database.url);
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_redis_settings(redis: RawRedisSettings) -> Result<RedisSettings, LoadError> {
    let url = non_blank(redis.url).unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
    if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
        return Err(LoadError::invalid(
            "redis.url",
            format!("`{url}` must use the redis:// or rediss:// scheme"),
        ));
    }
    let pool_size = non_zero_u32(
        redis.pool_size.unwrap_or(DEFAULT_REDIS_POOL_SIZE).into(),
        "redis.pool_size",
    )?;

    Ok(RedisSettings { url, pool_size })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let null_ttl = positive_secs(
        cache.null_ttl_seconds.unwrap_or(DEFAULT_NULL_TTL_SECS),
        "cache.null_ttl_seconds",
    )?;
    let shop_ttl = positive_secs(
        cache.shop_ttl_seconds.unwrap_or(DEFAULT_SHOP_TTL_SECS),
        "cache.shop_ttl_seconds",
    )?;
    if null_ttl >= shop_ttl {
        return Err(LoadError::invalid(
            "cache.null_ttl_seconds",
            "must be shorter than cache.shop_ttl_seconds",
        ));
    }
    let lock_ttl = positive_secs(
        cache.lock_ttl_seconds.unwrap_or(DEFAULT_LOCK_TTL_SECS),
        "cache.lock_ttl_seconds",
    )?;

    let rebuild_workers = non_zero_u32(
        cache.rebuild_workers.unwrap_or(DEFAULT_REBUILD_WORKERS).into(),
        "cache.rebuild_workers",
    )?;
    let rebuild_queue_capacity = non_zero_u32(
        cache
            .rebuild_queue_capacity
            .unwrap_or(DEFAULT_REBUILD_QUEUE_CAPACITY)
            .into(),
        "cache.rebuild_queue_capacity",
    )?;
    let mutex_max_attempts = non_zero_u32(
        cache
            .mutex_max_attempts
            .unwrap_or(DEFAULT_MUTEX_MAX_ATTEMPTS)
            .into(),
        "cache.mutex_max_attempts",
    )?;

    let base_ms = cache
        .mutex_backoff_base_ms
        .unwrap_or(DEFAULT_MUTEX_BACKOFF_BASE_MS);
    if base_ms == 0 {
        return Err(LoadError::invalid(
            "cache.mutex_backoff_base_ms",
            "must be greater than zero",
        ));
    }
    let max_ms = cache
        .mutex_backoff_max_ms
        .unwrap_or(DEFAULT_MUTEX_BACKOFF_MAX_MS);
    if max_ms < base_ms {
        return Err(LoadError::invalid(
            "cache.mutex_backoff_max_ms",
            "must not be smaller than cache.mutex_backoff_base_ms",
        ));
    }

    let shop_strategy = match cache.shop_strategy {
        Some(value) => Strategy::from_str(&value)
            .map_err(|err| LoadError::invalid("cache.shop_strategy", err.to_string()))?,
        None => Strategy::LogicalExpire,
    };

    Ok(CacheSettings {
        null_ttl,
        shop_ttl,
        lock_ttl,
        rebuild_workers,
        rebuild_queue_capacity,
        mutex_max_attempts,
        mutex_backoff_base: Duration::from_millis(base_ms),
        mutex_backoff_max: Duration::from_millis(max_ms),
        shop_strategy,
    })
}

fn build_seckill_settings(seckill: RawSeckillSettings) -> Result<SeckillSettings, LoadError> {
    let order_lock_timeout = positive_secs(
        seckill
            .order_lock_timeout_seconds
            .unwrap_or(DEFAULT_ORDER_LOCK_TIMEOUT_SECS),
        "seckill.order_lock_timeout_seconds",
    )?;
    let id_epoch_start = seckill.id_epoch_start.unwrap_or(DEFAULT_EPOCH_START);
    if id_epoch_start < 0 {
        return Err(LoadError::invalid(
            "seckill.id_epoch_start",
            "must not be negative",
        ));
    }

    Ok(SeckillSettings {
        order_lock_timeout,
        id_epoch_start,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRedisSettings {
    url: Option<String>,
    pool_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    null_ttl_seconds: Option<u64>,
    shop_ttl_seconds: Option<u64>,
    lock_ttl_seconds: Option<u64>,
    rebuild_workers: Option<u32>,
    rebuild_queue_capacity: Option<u32>,
    mutex_max_attempts: Option<u32>,
    mutex_backoff_base_ms: Option<u64>,
    mutex_backoff_max_ms: Option<u64>,
    shop_strategy: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSeckillSettings {
    order_lock_timeout_seconds: Option<u64>,
    id_epoch_start: Option<i64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn positive_secs(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
