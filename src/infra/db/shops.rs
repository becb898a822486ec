use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{RepoError, ShopsRepo},
    domain::entities::ShopRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ShopRow {
    id: i64,
    name: String,
    type_id: i64,
    images: String,
    area: Option<String>,
    address: String,
    x: f64,
    y: f64,
    avg_price: Option<i64>,
    sold: i32,
    comments: i32,
    score: i32,
    open_hours: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ShopRow> for ShopRecord {
    fn from(row: ShopRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            type_id: row.type_id,
            images: row.images,
            area: row.area,
            address: row.address,
            x: row.x,
            y: row.y,
            avg_price: row.avg_price,
            sold: row.sold,
            comments: row.comments,
            score: row.score,
            open_hours: row.open_hours,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ShopsRepo for PostgresRepositories {
    async fn find_shop(&self, id: i64) -> Result<Option<ShopRecord>, RepoError> {
        let row = sqlx::query_as::<_, ShopRow>(
            r#"
            SELECT id,
                   name,
                   type_id,
                   images,
                   area,
                   address,
                   x,
                   y,
                   avg_price,
                   sold,
                   comments,
                   score,
                   open_hours,
                   created_at,
                   updated_at
            FROM tb_shop
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ShopRecord::from))
    }

    async fn update_shop(&self, shop: &ShopRecord) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE tb_shop
            SET name = $2,
                type_id = $3,
                images = $4,
                area = $5,
                address = $6,
                x = $7,
                y = $8,
                avg_price = $9,
                sold = $10,
                comments = $11,
                score = $12,
                open_hours = $13,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(shop.id)
        .bind(&shop.name)
        .bind(shop.type_id)
        .bind(&shop.images)
        .bind(shop.area.as_deref())
        .bind(&shop.address)
        .bind(shop.x)
        .bind(shop.y)
        .bind(shop.avg_price)
        .bind(shop.sold)
        .bind(shop.comments)
        .bind(shop.score)
        .bind(shop.open_hours.as_deref())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
