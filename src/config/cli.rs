use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

use crate::cache::Strategy;

/// Command-line arguments for the flashsale binary.
#[derive(Debug, Parser)]
#[command(
    name = "flashsale",
    version,
    about = "Cache-aside shop lookups and flash-sale voucher orders"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FLASHSALE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Apply pending database migrations.
    Migrate(MigrateArgs),
    /// Look up one shop through the cache.
    Shop(ShopArgs),
    /// Write a logical-expiry cache entry for one shop.
    #[command(name = "warm-shop")]
    WarmShop(WarmShopArgs),
    /// List shop types through the cache.
    #[command(name = "shop-types")]
    ShopTypes(ShopTypesArgs),
    /// Place a flash-sale order for a voucher.
    Seckill(SeckillArgs),
    /// Generate one globally unique id.
    #[command(name = "next-id")]
    NextId(NextIdArgs),
}

impl Command {
    pub fn overrides(&self) -> &RuntimeOverrides {
        match self {
            Command::Migrate(args) => &args.overrides,
            Command::Shop(args) => &args.overrides,
            Command::WarmShop(args) => &args.overrides,
            Command::ShopTypes(args) => &args.overrides,
            Command::Seckill(args) => &args.overrides,
            Command::NextId(args) => &args.overrides,
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct RuntimeOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the Redis connection URL.
    #[arg(long = "redis-url", value_name = "URL")]
    pub redis_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub overrides: RuntimeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct ShopArgs {
    #[command(flatten)]
    pub overrides: RuntimeOverrides,

    /// Shop id.
    #[arg(value_name = "ID")]
    pub id: i64,

    /// Lookup strategy; defaults to `cache.shop_strategy`.
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<Strategy>,
}

#[derive(Debug, Args, Clone)]
pub struct WarmShopArgs {
    #[command(flatten)]
    pub overrides: RuntimeOverrides,

    /// Shop id.
    #[arg(value_name = "ID")]
    pub id: i64,

    /// Logical lifetime of the entry; defaults to `cache.shop_ttl_seconds`.
    #[arg(long = "expire-seconds", value_name = "SECONDS")]
    pub expire_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ShopTypesArgs {
    #[command(flatten)]
    pub overrides: RuntimeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct SeckillArgs {
    #[command(flatten)]
    pub overrides: RuntimeOverrides,

    /// Voucher to buy.
    #[arg(long = "voucher", value_name = "ID")]
    pub voucher_id: i64,

    /// Buying user.
    #[arg(long = "user", value_name = "ID")]
    pub user_id: i64,
}

#[derive(Debug, Args, Clone)]
pub struct NextIdArgs {
    #[command(flatten)]
    pub overrides: RuntimeOverrides,

    /// Key prefix the daily sequence is kept under.
    #[arg(value_name = "PREFIX")]
    pub prefix: String,
}
