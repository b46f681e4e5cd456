//! Receipt dispatch
//!
//! Receipts are best effort. The reconciler and checkout paths only enqueue
//! the frozen order; a background worker calls the dispatcher, so a slow or
//! failing mail provider never holds up a payment confirmation.

mod ses;

pub use ses::SesReceiptDispatcher;

use async_trait::async_trait;
use shared::models::Order;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Default queue depth; receipts beyond it are dropped with a warning
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[async_trait]
pub trait ReceiptDispatcher: Send + Sync {
    async fn send_receipt(&self, order: &Order) -> Result<(), BoxError>;
}

/// Plain-text receipt body. Prices come from the order lines, never the catalog.
pub fn render_receipt(order: &Order) -> String {
    let mut body = format!("Thank you for your order!\n\nOrder #{}\n\n", order.id);
    for line in &order.lines {
        body.push_str(&format!(
            "{} x{} @ {} = {}\n",
            line.description(),
            line.quantity,
            line.unit_price,
            line.line_total()
        ));
    }
    body.push_str(&format!("\nTotal: {}\n", order.total));
    body
}

pub fn receipt_subject(order: &Order) -> String {
    format!("Receipt: Order #{}", order.id)
}

/// Dispatcher used when no mail sender is configured
pub struct LogReceiptDispatcher;

#[async_trait]
impl ReceiptDispatcher for LogReceiptDispatcher {
    async fn send_receipt(&self, order: &Order) -> Result<(), BoxError> {
        tracing::info!(
            order_id = order.id,
            customer = %order.customer,
            total = %order.total,
            "Receipt (not mailed):\n{}",
            render_receipt(order)
        );
        Ok(())
    }
}

enum Job {
    Send(Box<Order>),
    Flush(oneshot::Sender<()>),
}

/// Handle to the receipt worker
#[derive(Clone)]
pub struct ReceiptQueue {
    tx: mpsc::Sender<Job>,
}

impl ReceiptQueue {
    /// Start the worker. It stops once every queue handle is dropped.
    pub fn spawn(dispatcher: Arc<dyn ReceiptDispatcher>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Job>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    Job::Send(order) => {
                        if let Err(e) = dispatcher.send_receipt(&order).await {
                            tracing::error!(order_id = order.id, error = %e, "Receipt dispatch failed");
                        }
                    }
                    Job::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            tracing::debug!("Receipt worker stopped");
        });
        (Self { tx }, handle)
    }

    /// Queue a receipt without waiting for it to be sent
    pub fn enqueue(&self, order: Order) {
        let order_id = order.id;
        match self.tx.try_send(Job::Send(Box::new(order))) {
            Ok(()) => tracing::debug!(order_id, "Receipt queued"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(order_id, "Receipt queue full, receipt dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(order_id, "Receipt worker stopped, receipt dropped");
            }
        }
    }

    /// Wait until every receipt queued before this call has been handled
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Job::Flush(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::models::{Customizations, OrderLine, OrderStatus, Size};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn order(id: i64) -> Order {
        Order {
            id,
            customer: "amy@example.com".into(),
            created_at: 0,
            total: dec!(17.00),
            payment_session_id: Some("cs_1".into()),
            status: OrderStatus::Paid,
            lines: vec![OrderLine {
                product_id: 7,
                product_name: "Jasmine Milk Tea".into(),
                size: Size::Large,
                customizations: Customizations::new("Less Ice", "50%"),
                quantity: 2,
                unit_price: dec!(8.50),
            }],
        }
    }

    #[derive(Default)]
    struct Flaky {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ReceiptDispatcher for Flaky {
        async fn send_receipt(&self, _order: &Order) -> Result<(), BoxError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                return Err("smtp down".into());
            }
            Ok(())
        }
    }

    #[test]
    fn test_render_uses_frozen_prices() {
        let body = render_receipt(&order(42));
        assert!(body.contains("Order #42"));
        assert!(body.contains("Jasmine Milk Tea (Large, 50%, Less Ice) x2 @ 8.50 = 17.00"));
        assert!(body.contains("Total: 17.00"));
        assert_eq!(receipt_subject(&order(42)), "Receipt: Order #42");
    }

    #[tokio::test]
    async fn test_worker_survives_dispatch_failure() {
        let dispatcher = Arc::new(Flaky::default());
        let (queue, _worker) = ReceiptQueue::spawn(dispatcher.clone(), 8);
        queue.enqueue(order(1));
        queue.enqueue(order(2));
        queue.flush().await;
        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_worker_stops_when_queue_dropped() {
        let (queue, worker) = ReceiptQueue::spawn(Arc::new(LogReceiptDispatcher), 1);
        queue.enqueue(order(1));
        drop(queue);
        worker.await.unwrap();
    }
}
