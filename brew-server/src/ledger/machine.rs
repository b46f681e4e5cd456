//! Order status state machine
//!
//! ```text
//! Pending ──paid──▶ Paid ──fulfilled──▶ Completed
//!                    │
//!                    └──cancelled──▶ Cancelled
//! ```
//!
//! Planning is pure: it only looks at the order as read. The ledger applies an
//! `Apply` step with a compare-and-set on the status it planned from, so two
//! writers racing on the same event both end in the same state and only one of
//! them observes `applied`.

use shared::models::{Order, OrderStatus};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Move from the current status to the target
    Apply,
    /// Already there, or terminal: report the current status, change nothing
    Unchanged,
}

fn action(target: OrderStatus) -> &'static str {
    match target {
        OrderStatus::Pending => "reopen",
        OrderStatus::Paid => "mark paid",
        OrderStatus::Completed => "complete",
        OrderStatus::Cancelled => "cancel",
    }
}

/// Decide what applying `target` to `order` means
pub fn plan(order: &Order, target: OrderStatus) -> CoreResult<Step> {
    let current = order.status;
    if current == target || current.is_terminal() {
        return Ok(Step::Unchanged);
    }

    match (current, target) {
        // A payment can only be confirmed against a session that was requested
        (OrderStatus::Pending, OrderStatus::Paid) if order.payment_session_id.is_some() => {
            Ok(Step::Apply)
        }
        (OrderStatus::Paid, OrderStatus::Completed | OrderStatus::Cancelled) => Ok(Step::Apply),
        _ => Err(CoreError::InvalidState {
            order_id: order.id,
            status: current,
            action: action(target),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn order(status: OrderStatus, session: Option<&str>) -> Order {
        Order {
            id: 1,
            customer: "amy@example.com".into(),
            created_at: 0,
            total: Decimal::ZERO,
            payment_session_id: session.map(String::from),
            status,
            lines: vec![],
        }
    }

    #[test]
    fn test_forward_transitions_apply() {
        assert_eq!(
            plan(&order(OrderStatus::Pending, Some("cs_1")), OrderStatus::Paid).unwrap(),
            Step::Apply
        );
        assert_eq!(
            plan(&order(OrderStatus::Paid, Some("cs_1")), OrderStatus::Completed).unwrap(),
            Step::Apply
        );
        assert_eq!(
            plan(&order(OrderStatus::Paid, Some("cs_1")), OrderStatus::Cancelled).unwrap(),
            Step::Apply
        );
    }

    #[test]
    fn test_repeat_and_terminal_are_noops() {
        assert_eq!(
            plan(&order(OrderStatus::Paid, Some("cs_1")), OrderStatus::Paid).unwrap(),
            Step::Unchanged
        );
        for terminal in [OrderStatus::Completed, OrderStatus::Cancelled] {
            for target in [
                OrderStatus::Pending,
                OrderStatus::Paid,
                OrderStatus::Completed,
                OrderStatus::Cancelled,
            ] {
                assert_eq!(
                    plan(&order(terminal, Some("cs_1")), target).unwrap(),
                    Step::Unchanged
                );
            }
        }
    }

    #[test]
    fn test_undefined_transitions_rejected() {
        let pending = order(OrderStatus::Pending, Some("cs_1"));
        assert!(matches!(
            plan(&pending, OrderStatus::Cancelled),
            Err(CoreError::InvalidState { action: "cancel", .. })
        ));
        assert!(matches!(
            plan(&pending, OrderStatus::Completed),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            plan(&order(OrderStatus::Paid, Some("cs_1")), OrderStatus::Pending),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_paid_requires_attached_session() {
        assert!(matches!(
            plan(&order(OrderStatus::Pending, None), OrderStatus::Paid),
            Err(CoreError::InvalidState {
                status: OrderStatus::Pending,
                ..
            })
        ));
    }
}
