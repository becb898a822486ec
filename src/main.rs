use std::{process, sync::Arc, time::Duration};

use flashsale::{
    application::{
        error::AppError,
        repos::{SeckillRepo, ShopTypesRepo, ShopsRepo},
        seckill::SeckillService,
        shops::{ShopService, ShopTypeService},
    },
    cache::{CacheClient, CacheConfig, KvStore},
    config::{self, Command, NextIdArgs, SeckillArgs, Settings, ShopArgs, WarmShopArgs},
    coordination::IdWorker,
    infra::{db::PostgresRepositories, error::InfraError, redis::RedisKvStore, telemetry},
};
use serde::Serialize;
use serde_json::json;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %report.joined(), "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %report.joined(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        Command::Migrate(_) => run_migrate(&settings).await,
        Command::Shop(args) => run_shop(&settings, args).await,
        Command::WarmShop(args) => run_warm_shop(&settings, args).await,
        Command::ShopTypes(_) => run_shop_types(&settings).await,
        Command::Seckill(args) => run_seckill(&settings, args).await,
        Command::NextId(args) => run_next_id(&settings, args).await,
    }
}

async fn run_migrate(settings: &Settings) -> Result<(), AppError> {
    init_repositories(settings).await?;
    info!(target = "flashsale::migrate", "Migrations applied");
    print_json(&json!({ "success": true }))
}

async fn run_shop(settings: &Settings, args: ShopArgs) -> Result<(), AppError> {
    let (service, cache) = shop_service(settings).await?;
    let result = match args.strategy {
        Some(strategy) => service.query_by_id_with(args.id, strategy).await,
        None => service.query_by_id(args.id).await,
    };
    // A stale logical entry schedules a rebuild; let it land before the runtime exits.
    cache.shutdown().await;
    let shop = result?;
    print_json(&json!({ "success": true, "data": shop }))
}

async fn run_warm_shop(settings: &Settings, args: WarmShopArgs) -> Result<(), AppError> {
    let expire = match args.expire_seconds {
        Some(0) => return Err(AppError::validation("--expire-seconds must be positive")),
        Some(seconds) => Duration::from_secs(seconds),
        None => settings.cache.shop_ttl,
    };

    let (service, cache) = shop_service(settings).await?;
    let result = service.warm(args.id, expire).await;
    cache.shutdown().await;
    let shop = result?;
    info!(
        target = "flashsale::warm",
        shop_id = shop.id,
        expire_secs = expire.as_secs(),
        "Shop cache warmed"
    );
    print_json(&json!({ "success": true, "data": shop }))
}

async fn run_shop_types(settings: &Settings) -> Result<(), AppError> {
    let repositories = init_repositories(settings).await?;
    let store = init_store(settings).await?;
    let repo: Arc<dyn ShopTypesRepo> = repositories;
    let service = ShopTypeService::new(repo, CacheClient::new(store, cache_config(settings)));

    let types = service.list().await?;
    print_json(&json!({ "success": true, "data": types }))
}

async fn run_seckill(settings: &Settings, args: SeckillArgs) -> Result<(), AppError> {
    let repositories = init_repositories(settings).await?;
    let store = init_store(settings).await?;
    let repo: Arc<dyn SeckillRepo> = repositories;
    let ids = IdWorker::with_epoch(Arc::clone(&store), settings.seckill.id_epoch_start);
    let service = SeckillService::new(repo, store, ids, settings.seckill.order_lock_timeout);

    match service.seckill_voucher(args.voucher_id, args.user_id).await {
        Ok(order_id) => print_json(&json!({ "success": true, "data": order_id })),
        Err(err) if !err.is_infrastructure() => print_json(&json!({
            "success": false,
            "kind": err.kind(),
            "errorMsg": err.reason(),
        })),
        Err(err) => Err(err.into()),
    }
}

async fn run_next_id(settings: &Settings, args: NextIdArgs) -> Result<(), AppError> {
    if args.prefix.trim().is_empty() {
        return Err(AppError::validation("prefix must not be empty"));
    }
    let store = init_store(settings).await?;
    let ids = IdWorker::with_epoch(store, settings.seckill.id_epoch_start);
    let id = ids.next_id(&args.prefix).await?;
    print_json(&json!({ "success": true, "data": id }))
}

async fn shop_service(settings: &Settings) -> Result<(ShopService, CacheClient), AppError> {
    let repositories = init_repositories(settings).await?;
    let store = init_store(settings).await?;
    let repo: Arc<dyn ShopsRepo> = repositories;
    let cache = CacheClient::new(store, cache_config(settings));
    Ok((ShopService::new(repo, cache.clone()), cache))
}

fn cache_config(settings: &Settings) -> CacheConfig {
    CacheConfig::from(&settings.cache)
}

async fn init_repositories(settings: &Settings) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn init_store(settings: &Settings) -> Result<Arc<dyn KvStore>, AppError> {
    let store = RedisKvStore::connect(&settings.redis).await?;
    Ok(Arc::new(store))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
