//! Payment reconciler (webhook path)
//!
//! The webhook endpoint is reachable by anyone, so nothing is read from the
//! ledger before the signature checks out. After that, payment confirmation
//! is the same idempotent `Paid` transition the success redirect uses;
//! whichever of the two lands first applies it, the other is a no-op.

use serde::Serialize;
use shared::models::OrderStatus;
use shared::util::now_millis;
use std::sync::Arc;
use std::time::Duration;

use crate::cart::CartStore;
use crate::error::{CoreError, CoreResult};
use crate::ledger::{OrderKey, OrderLedger};
use crate::receipt::ReceiptQueue;
use crate::stripe::{ProviderEvent, parse_event, verify_webhook_signature};

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub signing_secret: String,
    pub tolerance_secs: i64,
    /// Upper bound on ledger work for one notification
    pub budget: Duration,
}

/// How a verified notification was handled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WebhookAck {
    Processed {
        order_id: i64,
        status: OrderStatus,
        applied: bool,
    },
    Ignored {
        event_type: String,
    },
}

#[derive(Clone)]
pub struct PaymentReconciler {
    ledger: OrderLedger,
    carts: Arc<CartStore>,
    receipts: ReceiptQueue,
    settings: WebhookSettings,
}

impl PaymentReconciler {
    pub fn new(
        ledger: OrderLedger,
        carts: Arc<CartStore>,
        receipts: ReceiptQueue,
        settings: WebhookSettings,
    ) -> Self {
        Self {
            ledger,
            carts,
            receipts,
            settings,
        }
    }

    pub async fn handle_provider_notification(
        &self,
        raw_payload: &[u8],
        signature_header: Option<&str>,
    ) -> CoreResult<WebhookAck> {
        // 1. Authenticity, before anything else
        let header = signature_header.ok_or(CoreError::UnauthenticatedWebhook(
            "Missing Stripe-Signature header",
        ))?;
        if let Err(reason) = verify_webhook_signature(
            raw_payload,
            header,
            &self.settings.signing_secret,
            self.settings.tolerance_secs,
            now_millis() / 1000,
        ) {
            tracing::warn!(target: "security", reason, "Webhook signature verification failed");
            return Err(CoreError::UnauthenticatedWebhook(reason));
        }

        // 2. Relevant events only
        let (event_id, session_id, tagged_order) = match parse_event(raw_payload)? {
            ProviderEvent::Ignored {
                event_id,
                event_type,
            } => {
                tracing::debug!(%event_id, %event_type, "Webhook event ignored");
                return Ok(WebhookAck::Ignored { event_type });
            }
            ProviderEvent::PaymentSucceeded {
                event_id,
                session_id,
                order_id,
            } => (event_id, session_id, order_id),
        };
        tracing::info!(%event_id, %session_id, "Payment confirmation received");

        // 3 + 4. Locate by session and apply. Detached, so an applied
        // transition finishes its follow-up even past the budget.
        let ledger = self.ledger.clone();
        let carts = self.carts.clone();
        let receipts = self.receipts.clone();
        let key = OrderKey::Session(session_id.clone());
        let work = tokio::spawn(async move {
            let outcome = ledger.transition(&key, OrderStatus::Paid).await?;
            if outcome.applied {
                carts.clear(&outcome.order.customer);
                receipts.enqueue(outcome.order.clone());
            }
            Ok::<_, CoreError>(outcome)
        });

        let outcome = match tokio::time::timeout(self.settings.budget, work).await {
            Err(_) => {
                tracing::warn!(%event_id, %session_id, "Webhook budget exceeded, ledger work continues");
                return Err(CoreError::Timeout("webhook processing"));
            }
            Ok(Err(join)) => return Err(CoreError::Storage(format!("ledger task failed: {join}"))),
            Ok(Ok(result)) => result,
        }
        .inspect_err(|e| {
            if matches!(e, CoreError::NotFound(_)) {
                tracing::warn!(%event_id, %session_id, "No order for payment session");
            }
        })?;

        let order_id = outcome.order.id;
        if let Some(tagged) = tagged_order
            && tagged != order_id
        {
            tracing::warn!(%session_id, tagged, order_id, "Session metadata names a different order");
        }

        // 5. Acknowledge, no-op or not
        Ok(WebhookAck::Processed {
            order_id,
            status: outcome.status(),
            applied: outcome.applied,
        })
    }
}
