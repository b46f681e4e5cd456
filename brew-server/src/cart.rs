//! Cart store
//!
//! Session-scoped carts keyed by customer identity. A cart is created by the
//! first mutation, touched on every access and dropped on checkout success,
//! explicit clear or idle expiry. Nothing here is durable.
//!
//! A cart holds at most one entry per product id: writing a second size of the
//! same drink replaces the first entry.

use dashmap::DashMap;
use rust_decimal::Decimal;
use shared::models::{CartEntry, CartSnapshot, CustomerIdentity, Customizations, OrderLine, Size};
use std::time::{Duration, Instant};

use crate::error::{CoreError, CoreResult};
use crate::pricing::PricingResolver;

struct Cart {
    /// Insertion ordered
    entries: Vec<CartEntry>,
    last_touched: Instant,
}

impl Cart {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            last_touched: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_touched = Instant::now();
    }
}

pub struct CartStore {
    carts: DashMap<CustomerIdentity, Cart>,
    pricing: PricingResolver,
}

impl CartStore {
    pub fn new(pricing: PricingResolver) -> Self {
        Self {
            carts: DashMap::new(),
            pricing,
        }
    }

    /// Add or overwrite the entry for `product_id`.
    ///
    /// A quantity outside `1..=10` removes the entry instead and returns
    /// `Ok(None)`. Otherwise the product must be orderable.
    pub async fn upsert(
        &self,
        customer: &CustomerIdentity,
        product_id: i64,
        size: Size,
        customizations: Customizations,
        quantity: i32,
    ) -> CoreResult<Option<CartEntry>> {
        if !CartEntry::quantity_in_range(quantity) {
            self.remove(customer, product_id);
            return Ok(None);
        }

        let resolved = self.pricing.resolve(product_id, size).await?;
        let entry = CartEntry {
            product_id,
            product_name: resolved.product.name,
            size,
            customizations,
            quantity,
            unit_price: resolved.unit_price,
            subtotal: resolved.unit_price * Decimal::from(quantity),
        };

        let mut cart = self
            .carts
            .entry(customer.clone())
            .or_insert_with(Cart::new);
        cart.touch();
        match cart.entries.iter_mut().find(|e| e.product_id == product_id) {
            Some(existing) => *existing = entry.clone(),
            None => cart.entries.push(entry.clone()),
        }

        tracing::debug!(customer = %customer, product_id, quantity, "Cart entry written");
        Ok(Some(entry))
    }

    /// Remove the entry if present
    pub fn remove(&self, customer: &CustomerIdentity, product_id: i64) {
        if let Some(mut cart) = self.carts.get_mut(customer) {
            cart.touch();
            cart.entries.retain(|e| e.product_id != product_id);
        }
    }

    /// Ordered view with unit prices and subtotals re-read from the catalog.
    ///
    /// An entry whose product has since been deleted keeps its last price.
    pub async fn snapshot(&self, customer: &CustomerIdentity) -> CoreResult<CartSnapshot> {
        let mut entries = self.entries(customer);
        for entry in &mut entries {
            if let Some(product) = self.pricing.lookup(entry.product_id).await? {
                entry.unit_price = product.price_for(entry.size);
                entry.subtotal = entry.unit_price * Decimal::from(entry.quantity);
            }
        }
        let total = entries.iter().map(|e| e.subtotal).sum();
        Ok(CartSnapshot { entries, total })
    }

    /// Freeze the cart into order lines at current catalog prices.
    ///
    /// Fails with `EmptyCart` for an empty cart and `ProductUnavailable` if any
    /// entry can no longer be ordered. The cart itself is left untouched.
    pub async fn checkout_lines(&self, customer: &CustomerIdentity) -> CoreResult<Vec<OrderLine>> {
        let entries = self.entries(customer);
        if entries.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let mut lines = Vec::with_capacity(entries.len());
        for entry in entries {
            let resolved = self.pricing.resolve(entry.product_id, entry.size).await?;
            lines.push(OrderLine {
                product_id: entry.product_id,
                product_name: resolved.product.name,
                size: entry.size,
                customizations: entry.customizations,
                quantity: entry.quantity,
                unit_price: resolved.unit_price,
            });
        }
        Ok(lines)
    }

    pub fn clear(&self, customer: &CustomerIdentity) {
        if self.carts.remove(customer).is_some() {
            tracing::debug!(customer = %customer, "Cart cleared");
        }
    }

    /// Drop carts idle for at least `ttl`; returns how many were dropped
    pub fn expire_idle(&self, ttl: Duration) -> usize {
        let before = self.carts.len();
        self.carts
            .retain(|_, cart| cart.last_touched.elapsed() < ttl);
        before.saturating_sub(self.carts.len())
    }

    /// Number of live carts
    pub fn len(&self) -> usize {
        self.carts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carts.is_empty()
    }

    fn entries(&self, customer: &CustomerIdentity) -> Vec<CartEntry> {
        match self.carts.get_mut(customer) {
            Some(mut cart) => {
                cart.touch();
                cart.entries.clone()
            }
            None => Vec::new(),
        }
    }
}
