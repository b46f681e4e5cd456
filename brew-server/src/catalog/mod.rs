//! Catalog reader
//!
//! The ordering core only ever reads the catalog: product name, per-size
//! prices and availability. Catalog management lives elsewhere.

mod sql;

pub use sql::SqlCatalog;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::models::Product;
use std::collections::HashMap;

use crate::error::CoreResult;

/// Read access to the product catalog
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// `Ok(None)` when the product does not exist
    async fn get_product(&self, product_id: i64) -> CoreResult<Option<Product>>;
}

/// In-process catalog, used by tests and local demos
#[derive(Default)]
pub struct MemoryCatalog {
    products: RwLock<HashMap<i64, Product>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let catalog = Self::new();
        for product in products {
            catalog.upsert(product);
        }
        catalog
    }

    pub fn upsert(&self, product: Product) {
        self.products.write().insert(product.id, product);
    }

    pub fn set_available(&self, product_id: i64, available: bool) {
        if let Some(p) = self.products.write().get_mut(&product_id) {
            p.is_available = available;
        }
    }

    pub fn remove(&self, product_id: i64) {
        self.products.write().remove(&product_id);
    }
}

#[async_trait]
impl CatalogReader for MemoryCatalog {
    async fn get_product(&self, product_id: i64) -> CoreResult<Option<Product>> {
        Ok(self.products.read().get(&product_id).cloned())
    }
}
