//! Shop catalogue read and write paths.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::application::repos::{RepoError, ShopTypesRepo, ShopsRepo};
use crate::cache::keys::{CACHE_SHOP_KEY, CACHE_SHOP_TYPE_KEY, shop_key};
use crate::cache::{CacheClient, CacheError, Strategy};
use crate::domain::entities::{ShopRecord, ShopTypeRecord};

#[derive(Debug, Error)]
pub enum ShopError {
    #[error("shop {id} does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct ShopService {
    repo: Arc<dyn ShopsRepo>,
    cache: CacheClient,
}

impl ShopService {
    pub fn new(repo: Arc<dyn ShopsRepo>, cache: CacheClient) -> Self {
        Self { repo, cache }
    }

    /// Look up a shop with the configured default strategy.
    pub async fn query_by_id(&self, id: i64) -> Result<ShopRecord, ShopError> {
        self.query_by_id_with(id, self.cache.config().shop_strategy)
            .await
    }

    pub async fn query_by_id_with(
        &self,
        id: i64,
        strategy: Strategy,
    ) -> Result<ShopRecord, ShopError> {
        let repo = Arc::clone(&self.repo);
        let shop = self
            .cache
            .resolve(
                CACHE_SHOP_KEY,
                id,
                move |id| async move { repo.find_shop(id).await },
                self.cache.config().shop_ttl,
                strategy,
            )
            .await?;
        shop.ok_or(ShopError::NotFound { id })
    }

    /// Write the row first, then drop the cached copy so the next read reloads it.
    pub async fn update(&self, shop: &ShopRecord) -> Result<(), ShopError> {
        if !self.repo.update_shop(shop).await? {
            return Err(ShopError::NotFound { id: shop.id });
        }
        self.cache.invalidate(&shop_key(shop.id)).await?;
        info!(shop_id = shop.id, "Shop updated and cache invalidated");
        Ok(())
    }

    /// Pre-load a logical-expiry entry so [`Strategy::LogicalExpire`] lookups can hit.
    pub async fn warm(&self, id: i64, expire: Duration) -> Result<ShopRecord, ShopError> {
        let shop = self
            .repo
            .find_shop(id)
            .await?
            .ok_or(ShopError::NotFound { id })?;
        self.cache
            .set_with_logical_expire(&shop_key(id), &shop, expire)
            .await?;
        debug!(shop_id = id, expire_secs = expire.as_secs(), "Shop cache warmed");
        Ok(shop)
    }
}

#[derive(Clone)]
pub struct ShopTypeService {
    repo: Arc<dyn ShopTypesRepo>,
    cache: CacheClient,
}

impl ShopTypeService {
    pub fn new(repo: Arc<dyn ShopTypesRepo>, cache: CacheClient) -> Self {
        Self { repo, cache }
    }

    fn list_key() -> String {
        format!("{CACHE_SHOP_TYPE_KEY}list")
    }

    /// All shop types ordered by `sort`. The list is cached without a TTL.
    pub async fn list(&self) -> Result<Vec<ShopTypeRecord>, ShopError> {
        let key = Self::list_key();
        if let Some(types) = self.cache.get::<Vec<ShopTypeRecord>>(&key).await? {
            return Ok(types);
        }

        let types = self.repo.list_shop_types().await?;
        if !types.is_empty() {
            self.cache.set(&key, &types, None).await?;
        }
        Ok(types)
    }
}
