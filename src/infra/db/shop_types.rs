use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{RepoError, ShopTypesRepo},
    domain::entities::ShopTypeRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ShopTypeRow {
    id: i64,
    name: String,
    icon: String,
    sort: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ShopTypeRow> for ShopTypeRecord {
    fn from(row: ShopTypeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            icon: row.icon,
            sort: row.sort,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ShopTypesRepo for PostgresRepositories {
    async fn list_shop_types(&self) -> Result<Vec<ShopTypeRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ShopTypeRow>(
            r#"
            SELECT id, name, icon, sort, created_at, updated_at
            FROM tb_shop_type
            ORDER BY sort ASC, id ASC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ShopTypeRecord::from).collect())
    }
}
