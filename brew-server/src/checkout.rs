//! Checkout coordinator
//!
//! Turns a cart into a Pending order, opens a provider session for it and
//! handles the browser coming back from the provider's page.
//!
//! A provider failure after the order was created leaves that order Pending
//! without a session. Nothing here deletes it: the next checkout attempt with
//! the same cart reuses it, and the orphan sweep reports any that remain.

use serde::Serialize;
use shared::models::{CustomerIdentity, OrderStatus};
use std::sync::Arc;

use crate::cart::CartStore;
use crate::error::{CoreError, CoreResult};
use crate::ledger::{OrderKey, OrderLedger};
use crate::payment::{PaymentProvider, SessionRequest};
use crate::receipt::ReceiptQueue;

/// Redirect targets and currency for provider sessions
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub cart_url: String,
}

/// What the storefront needs to send the customer to the payment page
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutStart {
    pub order_id: i64,
    pub session_id: String,
    pub redirect_url: String,
}

#[derive(Clone)]
pub struct CheckoutCoordinator {
    carts: Arc<CartStore>,
    ledger: OrderLedger,
    provider: Arc<dyn PaymentProvider>,
    receipts: ReceiptQueue,
    settings: CheckoutSettings,
}

impl CheckoutCoordinator {
    pub fn new(
        carts: Arc<CartStore>,
        ledger: OrderLedger,
        provider: Arc<dyn PaymentProvider>,
        receipts: ReceiptQueue,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            carts,
            ledger,
            provider,
            receipts,
            settings,
        }
    }

    pub async fn initiate_checkout(&self, customer: &CustomerIdentity) -> CoreResult<CheckoutStart> {
        // 1. Freeze the cart; an empty cart creates nothing
        let lines = self.carts.checkout_lines(customer).await?;

        // 2. Pending order, reusing one a failed attempt left for the same cart
        let order = match self.ledger.reusable_pending(customer, &lines).await? {
            Some(existing) => {
                tracing::info!(order_id = existing.id, customer = %customer, "Reusing pending order without session");
                existing
            }
            None => self.ledger.create(customer, lines).await?,
        };

        // 3. Provider session tagged with the order id
        let request = SessionRequest::for_order(
            &order,
            &self.settings.currency,
            &self.settings.success_url,
            &self.settings.cancel_url,
        )?;
        let session = self.provider.create_session(&request).await.inspect_err(|e| {
            tracing::warn!(order_id = order.id, error = %e, "Payment session creation failed, order left pending");
        })?;

        // 4. Correlate
        self.ledger
            .attach_payment_session(order.id, &session.session_id)
            .await?;

        tracing::info!(order_id = order.id, session_id = %session.session_id, "Checkout started");
        Ok(CheckoutStart {
            order_id: order.id,
            session_id: session.session_id,
            redirect_url: session.redirect_url,
        })
    }

    /// The browser came back from a successful payment.
    ///
    /// `session_hint` is the session id the provider substitutes into the
    /// success URL. Without it the customer's newest Pending order that
    /// reached the provider is used, or the newest Paid one on a reload.
    pub async fn handle_success_redirect(
        &self,
        customer: &CustomerIdentity,
        session_hint: Option<&str>,
    ) -> CoreResult<i64> {
        let order = match session_hint.filter(|s| !s.is_empty()) {
            Some(session_id) => {
                let order = self.ledger.find_by_session(session_id).await?;
                if !order.is_owned_by(customer) {
                    return Err(CoreError::Forbidden(order.id));
                }
                order
            }
            None => self
                .ledger
                .redirect_target(customer)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("open order for {customer}")))?,
        };

        if !matches!(order.status, OrderStatus::Pending | OrderStatus::Paid) {
            tracing::info!(order_id = order.id, status = %order.status, "Stale success redirect");
            return Err(CoreError::order_not_found(order.id));
        }

        let outcome = self
            .ledger
            .transition(&OrderKey::Id(order.id), OrderStatus::Paid)
            .await?;
        if outcome.status() != OrderStatus::Paid {
            // Moved on between the read and the transition (cancelled, fulfilled)
            return Err(CoreError::order_not_found(order.id));
        }

        self.carts.clear(customer);
        if outcome.applied {
            self.receipts.enqueue(outcome.order);
        }
        Ok(order.id)
    }

    /// Where the provider's cancel button lands; no order is touched
    pub fn handle_cancel_redirect(&self) -> &str {
        &self.settings.cart_url
    }
}
