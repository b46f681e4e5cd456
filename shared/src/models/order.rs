//! Order Model
//!
//! An order is a frozen snapshot of a cart at checkout time. Lines carry the
//! unit price that was charged; nothing here is ever recomputed from the
//! catalog, so receipts stay stable when prices change later.

use super::cart::Customizations;
use super::catalog::Size;
use super::identity::CustomerIdentity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status
///
/// `Pending → Paid → Completed`, with `Paid → Cancelled` as a side branch.
/// `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// No event moves an order out of a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db())
    }
}

/// Order line, captured from a cart entry at checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub product_name: String,
    pub size: Size,
    pub customizations: Customizations,
    pub quantity: i32,
    /// Unit price at the time of order
    pub unit_price: Decimal,
}

impl OrderLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Human readable description used on receipts and provider line items
    pub fn description(&self) -> String {
        format!(
            "{} ({}, {}, {})",
            self.product_name,
            self.size,
            self.customizations.sugar_level,
            self.customizations.ice_level
        )
    }
}

/// Sum of `quantity × unit_price` over the lines
pub fn lines_total(lines: &[OrderLine]) -> Decimal {
    lines.iter().map(OrderLine::line_total).sum()
}

/// Durable order aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer: CustomerIdentity,
    /// Creation time (Unix millis)
    pub created_at: i64,
    pub total: Decimal,
    /// Payment provider session, set at most once
    pub payment_session_id: Option<String>,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
}

impl Order {
    pub fn is_owned_by(&self, customer: &CustomerIdentity) -> bool {
        &self.customer == customer
    }
}

/// Sort keys accepted by the admin order search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderSort {
    Id,
    #[default]
    IdDesc,
    Time,
    TimeDesc,
    Total,
    TotalDesc,
}

/// Admin order search filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    /// Substring match on the customer identity or the order id
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: OrderSort,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            sort: OrderSort::default(),
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl OrderQuery {
    /// Rows to skip for the requested page (pages start at 1).
    /// Computed in `u64` so any `page` × `page_size` fits.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }

    pub fn matches(&self, order: &Order) -> bool {
        if let Some(status) = self.status
            && order.status != status
        {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                order.customer.as_str().contains(term) || order.id.to_string().contains(term)
            }
            _ => true,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub page: u32,
    pub page_size: u32,
}
