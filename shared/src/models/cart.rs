//! Cart Model
//!
//! Cart entries are session scoped and never durable. The price on an entry is
//! a snapshot taken when it was last written; reads refresh it from the
//! catalog until checkout freezes it into an order line.

use super::catalog::Size;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Smallest quantity that keeps an entry in the cart
pub const MIN_QUANTITY: i32 = 1;
/// Largest quantity that keeps an entry in the cart
pub const MAX_QUANTITY: i32 = 10;

/// Ice and sugar preferences, free-form as chosen on the menu
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Customizations {
    pub ice_level: String,
    pub sugar_level: String,
}

impl Customizations {
    pub fn new(ice_level: impl Into<String>, sugar_level: impl Into<String>) -> Self {
        Self {
            ice_level: ice_level.into(),
            sugar_level: sugar_level.into(),
        }
    }
}

/// One product selection in a cart
///
/// There is at most one entry per product id; a second size of the same
/// drink replaces the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    pub product_id: i64,
    pub product_name: String,
    pub size: Size,
    pub customizations: Customizations,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl CartEntry {
    /// Whether a requested quantity keeps the entry (anything else removes it)
    pub fn quantity_in_range(quantity: i32) -> bool {
        (MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity)
    }
}

/// Cart view returned to the storefront
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CartSnapshot {
    pub entries: Vec<CartEntry>,
    pub total: Decimal,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
