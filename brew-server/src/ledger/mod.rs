//! Order ledger
//!
//! Durable orders and the status state machine. Storage backends implement
//! [`LedgerStore`], a handful of primitive reads and single-row
//! compare-and-set writes; [`OrderLedger`] layers the business rules on top so
//! every backend shares them.
//!
//! The only serialization point is the order row. Transitions on different
//! orders never contend, and two transitions on the same order are resolved by
//! the status compare-and-set rather than by a lock held across calls.

pub mod machine;
mod memory;
mod sqlite;

pub use memory::MemoryLedgerStore;
pub use sqlite::SqliteLedgerStore;

use async_trait::async_trait;
use shared::models::{
    CustomerIdentity, Order, OrderLine, OrderQuery, OrderStatus, Paged, lines_total,
};
use shared::util::{now_millis, snowflake_id};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use machine::Step;

/// Upper bound on re-reads after losing a compare-and-set. Statuses only move
/// forward, so a writer can lose at most once per remaining transition.
const MAX_CAS_ATTEMPTS: usize = 4;

/// Storage primitives behind the ledger
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert(&self, order: &Order) -> CoreResult<()>;

    async fn get(&self, order_id: i64) -> CoreResult<Option<Order>>;

    async fn find_by_session(&self, session_id: &str) -> CoreResult<Option<Order>>;

    /// Store `session_id` if the order has none yet.
    ///
    /// Returns the session id stored afterwards (which differs from the
    /// argument when another one was already attached), or `None` when the
    /// order does not exist.
    async fn attach_session(&self, order_id: i64, session_id: &str) -> CoreResult<Option<String>>;

    /// Set the status to `next` only if it is still `expected`
    async fn compare_and_set_status(
        &self,
        order_id: i64,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> CoreResult<bool>;

    /// Orders of one customer, newest first
    async fn list_for_customer(&self, customer: &CustomerIdentity) -> CoreResult<Vec<Order>>;

    async fn search(&self, query: &OrderQuery) -> CoreResult<Paged<Order>>;

    /// Pending orders without a session created before `created_before`, oldest first
    async fn pending_without_session(&self, created_before: i64) -> CoreResult<Vec<Order>>;

    async fn count(&self) -> CoreResult<u64>;
}

/// How a transition is addressed: the redirect path knows the order, the
/// webhook path only the provider session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderKey {
    Id(i64),
    Session(String),
}

impl From<i64> for OrderKey {
    fn from(id: i64) -> Self {
        OrderKey::Id(id)
    }
}

impl From<&str> for OrderKey {
    fn from(session_id: &str) -> Self {
        OrderKey::Session(session_id.to_string())
    }
}

/// Result of [`OrderLedger::transition`]
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The order as it stands after the call
    pub order: Order,
    /// True only for the caller whose write moved the status
    pub applied: bool,
}

impl TransitionOutcome {
    pub fn status(&self) -> OrderStatus {
        self.order.status
    }
}

#[derive(Clone)]
pub struct OrderLedger {
    store: Arc<dyn LedgerStore>,
}

impl OrderLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Persist a new Pending order; the total is frozen from the lines
    pub async fn create(
        &self,
        customer: &CustomerIdentity,
        lines: Vec<OrderLine>,
    ) -> CoreResult<Order> {
        if lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let order = Order {
            id: snowflake_id(),
            customer: customer.clone(),
            created_at: now_millis(),
            total: lines_total(&lines),
            payment_session_id: None,
            status: OrderStatus::Pending,
            lines,
        };
        self.store.insert(&order).await?;

        tracing::info!(order_id = order.id, customer = %customer, total = %order.total, "Order created");
        Ok(order)
    }

    /// Attach the provider session. Re-attaching the same id is a no-op.
    pub async fn attach_payment_session(&self, order_id: i64, session_id: &str) -> CoreResult<Order> {
        match self.store.attach_session(order_id, session_id).await? {
            None => Err(CoreError::order_not_found(order_id)),
            Some(stored) if stored == session_id => {
                tracing::info!(order_id, session_id, "Payment session attached");
                self.get(order_id).await
            }
            Some(existing) => Err(CoreError::AlreadyAttached { order_id, existing }),
        }
    }

    /// Apply a status event. Idempotent and commutative: repeating or racing
    /// the same event ends in the same status, and `applied` is true for
    /// exactly one caller.
    pub async fn transition(&self, key: &OrderKey, target: OrderStatus) -> CoreResult<TransitionOutcome> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let mut order = self.load(key).await?;
            match machine::plan(&order, target)? {
                Step::Unchanged => {
                    tracing::debug!(order_id = order.id, status = %order.status, target = %target, "Transition is a no-op");
                    return Ok(TransitionOutcome {
                        order,
                        applied: false,
                    });
                }
                Step::Apply => {
                    let from = order.status;
                    if self
                        .store
                        .compare_and_set_status(order.id, from, target)
                        .await?
                    {
                        order.status = target;
                        tracing::info!(order_id = order.id, from = %from, to = %target, "Order status changed");
                        return Ok(TransitionOutcome {
                            order,
                            applied: true,
                        });
                    }
                    tracing::debug!(order_id = order.id, "Lost status race, re-reading");
                }
            }
        }
        Err(CoreError::Storage(format!(
            "status of {key:?} kept changing underneath the transition"
        )))
    }

    /// Customer cancellation: owner only, and only while Paid
    pub async fn cancel(&self, order_id: i64, requester: &CustomerIdentity) -> CoreResult<Order> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let mut order = self.get(order_id).await?;
            if !order.is_owned_by(requester) {
                return Err(CoreError::Forbidden(order_id));
            }
            if order.status != OrderStatus::Paid {
                return Err(CoreError::InvalidState {
                    order_id,
                    status: order.status,
                    action: "cancel",
                });
            }
            if self
                .store
                .compare_and_set_status(order_id, OrderStatus::Paid, OrderStatus::Cancelled)
                .await?
            {
                order.status = OrderStatus::Cancelled;
                tracing::info!(order_id, customer = %requester, "Order cancelled by customer");
                return Ok(order);
            }
        }
        Err(CoreError::Storage(format!(
            "status of order {order_id} kept changing underneath the cancel"
        )))
    }

    /// Administrative fulfilment, Paid → Completed
    pub async fn fulfil(&self, order_id: i64) -> CoreResult<TransitionOutcome> {
        self.transition(&OrderKey::Id(order_id), OrderStatus::Completed)
            .await
    }

    pub async fn get(&self, order_id: i64) -> CoreResult<Order> {
        self.store
            .get(order_id)
            .await?
            .ok_or_else(|| CoreError::order_not_found(order_id))
    }

    pub async fn find_by_session(&self, session_id: &str) -> CoreResult<Order> {
        self.store
            .find_by_session(session_id)
            .await?
            .ok_or_else(|| CoreError::session_not_found(session_id))
    }

    /// Order history, newest first
    pub async fn list_for_customer(&self, customer: &CustomerIdentity) -> CoreResult<Vec<Order>> {
        self.store.list_for_customer(customer).await
    }

    /// Order a success redirect without a session id refers to: the newest
    /// Pending order that reached the payment provider, else the newest Paid
    /// one (a reloaded success page).
    pub async fn redirect_target(&self, customer: &CustomerIdentity) -> CoreResult<Option<Order>> {
        let with_session: Vec<Order> = self
            .store
            .list_for_customer(customer)
            .await?
            .into_iter()
            .filter(|o| o.payment_session_id.is_some())
            .collect();
        let pick = |status: OrderStatus| with_session.iter().find(|o| o.status == status).cloned();
        Ok(pick(OrderStatus::Pending).or_else(|| pick(OrderStatus::Paid)))
    }

    /// A session-less Pending order with exactly these lines, left behind by
    /// a checkout whose provider call failed
    pub async fn reusable_pending(
        &self,
        customer: &CustomerIdentity,
        lines: &[OrderLine],
    ) -> CoreResult<Option<Order>> {
        Ok(self
            .store
            .list_for_customer(customer)
            .await?
            .into_iter()
            .find(|o| {
                o.status == OrderStatus::Pending
                    && o.payment_session_id.is_none()
                    && o.lines.as_slice() == lines
            }))
    }

    pub async fn search(&self, query: &OrderQuery) -> CoreResult<Paged<Order>> {
        self.store.search(query).await
    }

    /// Pending orders that never got a session and are older than `age`
    pub async fn orphans(&self, age: Duration) -> CoreResult<Vec<Order>> {
        let age_ms = i64::try_from(age.as_millis()).unwrap_or(i64::MAX);
        self.store
            .pending_without_session(now_millis().saturating_sub(age_ms))
            .await
    }

    pub async fn count(&self) -> CoreResult<u64> {
        self.store.count().await
    }

    async fn load(&self, key: &OrderKey) -> CoreResult<Order> {
        match key {
            OrderKey::Id(id) => self.get(*id).await,
            OrderKey::Session(session_id) => self.find_by_session(session_id).await,
        }
    }
}
