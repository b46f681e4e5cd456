//! Periodic housekeeping: idle cart expiry and orphan reporting.
//!
//! Orphans (Pending orders that never got a payment session) are only
//! reported. Deleting or expiring them is left to an operator.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::cart::CartStore;
use crate::ledger::OrderLedger;

#[derive(Debug, Clone, Copy)]
pub struct SweepSettings {
    pub cart_idle_ttl: Duration,
    pub orphan_timeout: Duration,
    pub interval: Duration,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_carts: usize,
    pub orphan_order_ids: Vec<i64>,
}

pub async fn run_once(carts: &CartStore, ledger: &OrderLedger, settings: &SweepSettings) -> SweepReport {
    let expired_carts = carts.expire_idle(settings.cart_idle_ttl);
    if expired_carts > 0 {
        tracing::info!(expired_carts, "Expired idle carts");
    }

    let orphan_order_ids = match ledger.orphans(settings.orphan_timeout).await {
        Ok(orphans) => {
            for order in &orphans {
                tracing::warn!(
                    order_id = order.id,
                    customer = %order.customer,
                    created_at = order.created_at,
                    total = %order.total,
                    "Pending order has no payment session"
                );
            }
            orphans.into_iter().map(|o| o.id).collect()
        }
        Err(e) => {
            tracing::error!(error = %e, "Orphan scan failed");
            Vec::new()
        }
    };

    SweepReport {
        expired_carts,
        orphan_order_ids,
    }
}

/// Run the sweep forever on `settings.interval`
pub fn spawn(carts: Arc<CartStore>, ledger: OrderLedger, settings: SweepSettings) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(settings.interval);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            run_once(&carts, &ledger, &settings).await;
        }
    })
}
