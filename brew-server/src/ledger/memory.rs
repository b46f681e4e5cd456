use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use shared::models::{CustomerIdentity, Order, OrderQuery, OrderSort, OrderStatus, Paged};
use std::cmp::Ordering;
use std::sync::Arc;

use super::LedgerStore;
use crate::error::{CoreError, CoreResult};

/// In-process ledger store.
///
/// Each order sits behind its own mutex. No path holds two order locks, and
/// the session index is only written while holding the owning order's lock.
#[derive(Default)]
pub struct MemoryLedgerStore {
    orders: DashMap<i64, Arc<Mutex<Order>>>,
    sessions: DashMap<String, i64>,
    /// Order ids per customer in insertion order
    customers: DashMap<CustomerIdentity, Vec<i64>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, order_id: i64) -> Option<Arc<Mutex<Order>>> {
        self.orders.get(&order_id).map(|r| Arc::clone(r.value()))
    }

    fn read(&self, order_id: i64) -> Option<Order> {
        self.slot(order_id).map(|slot| slot.lock().clone())
    }

    fn all(&self) -> Vec<Order> {
        let slots: Vec<_> = self.orders.iter().map(|r| Arc::clone(r.value())).collect();
        slots.into_iter().map(|slot| slot.lock().clone()).collect()
    }
}

fn compare(sort: OrderSort, a: &Order, b: &Order) -> Ordering {
    match sort {
        OrderSort::Id => a.id.cmp(&b.id),
        OrderSort::IdDesc => b.id.cmp(&a.id),
        OrderSort::Time => a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)),
        OrderSort::TimeDesc => b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)),
        OrderSort::Total => a.total.cmp(&b.total).then(a.id.cmp(&b.id)),
        OrderSort::TotalDesc => b.total.cmp(&a.total).then(b.id.cmp(&a.id)),
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn insert(&self, order: &Order) -> CoreResult<()> {
        match self.orders.entry(order.id) {
            Entry::Occupied(_) => {
                return Err(CoreError::Storage(format!("order {} already exists", order.id)));
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(order.clone())));
            }
        }
        self.customers
            .entry(order.customer.clone())
            .or_default()
            .push(order.id);
        Ok(())
    }

    async fn get(&self, order_id: i64) -> CoreResult<Option<Order>> {
        Ok(self.read(order_id))
    }

    async fn find_by_session(&self, session_id: &str) -> CoreResult<Option<Order>> {
        let order_id = self.sessions.get(session_id).map(|r| *r.value());
        Ok(order_id.and_then(|id| self.read(id)))
    }

    async fn attach_session(&self, order_id: i64, session_id: &str) -> CoreResult<Option<String>> {
        let Some(slot) = self.slot(order_id) else {
            return Ok(None);
        };
        let mut order = slot.lock();
        if let Some(existing) = &order.payment_session_id {
            return Ok(Some(existing.clone()));
        }
        match self.sessions.entry(session_id.to_string()) {
            Entry::Occupied(other) => {
                return Err(CoreError::Storage(format!(
                    "payment session {session_id} is already bound to order {}",
                    other.get()
                )));
            }
            Entry::Vacant(v) => {
                v.insert(order_id);
            }
        }
        order.payment_session_id = Some(session_id.to_string());
        Ok(Some(session_id.to_string()))
    }

    async fn compare_and_set_status(
        &self,
        order_id: i64,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> CoreResult<bool> {
        let Some(slot) = self.slot(order_id) else {
            return Err(CoreError::order_not_found(order_id));
        };
        let mut order = slot.lock();
        if order.status != expected {
            return Ok(false);
        }
        order.status = next;
        Ok(true)
    }

    async fn list_for_customer(&self, customer: &CustomerIdentity) -> CoreResult<Vec<Order>> {
        let ids = self
            .customers
            .get(customer)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        Ok(ids.into_iter().rev().filter_map(|id| self.read(id)).collect())
    }

    async fn search(&self, query: &OrderQuery) -> CoreResult<Paged<Order>> {
        let mut matched: Vec<Order> = self
            .all()
            .into_iter()
            .filter(|o| query.matches(o))
            .collect();
        matched.sort_by(|a, b| compare(query.sort, a, b));

        let total_items = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.page_size as usize)
            .collect();
        Ok(Paged {
            items,
            total_items,
            page: query.page.max(1),
            page_size: query.page_size,
        })
    }

    async fn pending_without_session(&self, created_before: i64) -> CoreResult<Vec<Order>> {
        let mut orphans: Vec<Order> = self
            .all()
            .into_iter()
            .filter(|o| {
                o.status == OrderStatus::Pending
                    && o.payment_session_id.is_none()
                    && o.created_at < created_before
            })
            .collect();
        orphans.sort_by_key(|o| (o.created_at, o.id));
        Ok(orphans)
    }

    async fn count(&self) -> CoreResult<u64> {
        Ok(self.orders.len() as u64)
    }
}
