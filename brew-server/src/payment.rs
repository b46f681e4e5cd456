//! Payment provider boundary

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use shared::models::Order;

use crate::error::{CoreError, CoreResult};

/// One provider line item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLine {
    pub description: String,
    /// Unit amount in minor currency units
    pub unit_amount: i64,
    pub quantity: i32,
}

/// Everything the provider needs to open a hosted payment page for an order
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub order_id: i64,
    pub amount: Decimal,
    pub currency: String,
    pub lines: Vec<SessionLine>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Convert a money amount to minor units (`8.50` → `850`)
pub fn to_minor_units(amount: Decimal) -> CoreResult<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| CoreError::PaymentProvider(format!("amount {amount} out of range")))
}

impl SessionRequest {
    pub fn for_order(
        order: &Order,
        currency: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> CoreResult<Self> {
        let lines = order
            .lines
            .iter()
            .map(|line| {
                Ok(SessionLine {
                    description: line.description(),
                    unit_amount: to_minor_units(line.unit_price)?,
                    quantity: line.quantity,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Self {
            order_id: order.id,
            amount: order.total,
            currency: currency.to_string(),
            lines,
            success_url: success_url.to_string(),
            cancel_url: cancel_url.to_string(),
        })
    }
}

/// A created provider session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    pub session_id: String,
    pub redirect_url: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Open a payment session. No retries: a failure is reported as
    /// `CoreError::PaymentProvider` and the caller decides.
    async fn create_session(&self, request: &SessionRequest) -> CoreResult<PaymentSession>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::models::{Customizations, OrderLine, OrderStatus, Size};

    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(dec!(8.50)).unwrap(), 850);
        assert_eq!(to_minor_units(dec!(17)).unwrap(), 1700);
        assert_eq!(to_minor_units(dec!(0.015)).unwrap(), 2);
    }

    #[test]
    fn test_request_for_order() {
        let order = Order {
            id: 99,
            customer: "amy@example.com".into(),
            created_at: 0,
            total: dec!(17.00),
            payment_session_id: None,
            status: OrderStatus::Pending,
            lines: vec![OrderLine {
                product_id: 7,
                product_name: "Jasmine Milk Tea".into(),
                size: Size::Large,
                customizations: Customizations::new("Less Ice", "50%"),
                quantity: 2,
                unit_price: dec!(8.50),
            }],
        };
        let req = SessionRequest::for_order(&order, "myr", "https://s", "https://c").unwrap();
        assert_eq!(req.order_id, 99);
        assert_eq!(req.amount, dec!(17.00));
        assert_eq!(
            req.lines,
            vec![SessionLine {
                description: "Jasmine Milk Tea (Large, 50%, Less Ice)".into(),
                unit_amount: 850,
                quantity: 2,
            }]
        );
    }
}
