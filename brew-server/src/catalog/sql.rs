use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::Product;
use sqlx::SqlitePool;
use std::str::FromStr;

use super::CatalogReader;
use crate::error::{CoreError, CoreResult};

/// Catalog backed by the `products` table
#[derive(Clone)]
pub struct SqlCatalog {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    price_regular: String,
    price_large: String,
    is_available: bool,
}

fn parse_price(raw: &str, product_id: i64) -> CoreResult<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| CoreError::Storage(format!("product {product_id} has bad price {raw:?}: {e}")))
}

impl TryFrom<ProductRow> for Product {
    type Error = CoreError;

    fn try_from(row: ProductRow) -> CoreResult<Self> {
        Ok(Product {
            price_regular: parse_price(&row.price_regular, row.id)?,
            price_large: parse_price(&row.price_large, row.id)?,
            id: row.id,
            name: row.name,
            is_available: row.is_available,
        })
    }
}

impl SqlCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace a product row
    pub async fn upsert(&self, product: &Product) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO products (id, name, price_regular, price_large, is_available)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                price_regular = excluded.price_regular,
                price_large = excluded.price_large,
                is_available = excluded.is_available",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price_regular.to_string())
        .bind(product.price_large.to_string())
        .bind(product.is_available)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogReader for SqlCatalog {
    async fn get_product(&self, product_id: i64) -> CoreResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, name, price_regular, price_large, is_available FROM products WHERE id = ?",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Product::try_from).transpose()
    }
}
