//! Pricing resolver
//!
//! Unit prices are always read from the catalog at call time. Nothing here
//! caches, so a cart re-read after a price change shows the new price.

use rust_decimal::Decimal;
use shared::models::{Product, Size};
use std::sync::Arc;

use crate::catalog::CatalogReader;
use crate::error::{CoreError, CoreResult};

/// A product together with its current unit price for one size
#[derive(Debug, Clone)]
pub struct ResolvedPrice {
    pub product: Product,
    pub unit_price: Decimal,
}

#[derive(Clone)]
pub struct PricingResolver {
    catalog: Arc<dyn CatalogReader>,
}

impl PricingResolver {
    pub fn new(catalog: Arc<dyn CatalogReader>) -> Self {
        Self { catalog }
    }

    /// Price for an orderable product; missing or unavailable products fail
    pub async fn resolve(&self, product_id: i64, size: Size) -> CoreResult<ResolvedPrice> {
        match self.catalog.get_product(product_id).await? {
            Some(product) if product.is_available => Ok(ResolvedPrice {
                unit_price: product.price_for(size),
                product,
            }),
            _ => Err(CoreError::ProductUnavailable(product_id)),
        }
    }

    /// Current catalog entry regardless of availability, for display refreshes
    pub async fn lookup(&self, product_id: i64) -> CoreResult<Option<Product>> {
        self.catalog.get_product(product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use rust_decimal_macros::dec;

    fn catalog() -> Arc<MemoryCatalog> {
        Arc::new(MemoryCatalog::with_products([Product {
            id: 7,
            name: "Jasmine Milk Tea".into(),
            price_regular: dec!(6.90),
            price_large: dec!(8.50),
            is_available: true,
        }]))
    }

    #[tokio::test]
    async fn test_resolve_by_size() {
        let pricing = PricingResolver::new(catalog());
        let large = pricing.resolve(7, Size::Large).await.unwrap();
        assert_eq!(large.unit_price, dec!(8.50));
        assert_eq!(large.product.name, "Jasmine Milk Tea");
        let regular = pricing.resolve(7, Size::Regular).await.unwrap();
        assert_eq!(regular.unit_price, dec!(6.90));
    }

    #[tokio::test]
    async fn test_missing_or_unavailable_product_fails() {
        let catalog = catalog();
        let pricing = PricingResolver::new(catalog.clone());

        assert!(matches!(
            pricing.resolve(99, Size::Large).await,
            Err(CoreError::ProductUnavailable(99))
        ));

        catalog.set_available(7, false);
        assert!(matches!(
            pricing.resolve(7, Size::Large).await,
            Err(CoreError::ProductUnavailable(7))
        ));
        assert!(pricing.lookup(7).await.unwrap().is_some());
    }
}
