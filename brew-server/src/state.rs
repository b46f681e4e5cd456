//! Application state for brew-server

use std::sync::Arc;

use crate::cart::CartStore;
use crate::catalog::{CatalogReader, SqlCatalog};
use crate::checkout::{CheckoutCoordinator, CheckoutSettings};
use crate::config::Config;
use crate::db::DbService;
use crate::ledger::{LedgerStore, OrderLedger, SqliteLedgerStore};
use crate::payment::PaymentProvider;
use crate::pricing::PricingResolver;
use crate::receipt::{
    DEFAULT_QUEUE_CAPACITY, LogReceiptDispatcher, ReceiptDispatcher, ReceiptQueue,
    SesReceiptDispatcher,
};
use crate::reconciler::{PaymentReconciler, WebhookSettings};
use crate::stripe::StripeClient;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// External collaborators the core is wired to
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogReader>,
    pub ledger_store: Arc<dyn LedgerStore>,
    pub provider: Arc<dyn PaymentProvider>,
    pub receipts: Arc<dyn ReceiptDispatcher>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub carts: Arc<CartStore>,
    pub ledger: OrderLedger,
    pub checkout: CheckoutCoordinator,
    pub reconciler: PaymentReconciler,
    pub receipts: ReceiptQueue,
}

impl AppState {
    /// Wire the core from its collaborators and start the receipt worker.
    /// Must be called inside a tokio runtime.
    pub fn assemble(config: Config, parts: Collaborators) -> Self {
        let carts = Arc::new(CartStore::new(PricingResolver::new(parts.catalog)));
        let ledger = OrderLedger::new(parts.ledger_store);
        let (receipts, _worker) = ReceiptQueue::spawn(parts.receipts, DEFAULT_QUEUE_CAPACITY);

        let checkout = CheckoutCoordinator::new(
            carts.clone(),
            ledger.clone(),
            parts.provider,
            receipts.clone(),
            CheckoutSettings {
                currency: config.currency.clone(),
                success_url: config.success_url(),
                cancel_url: config.cancel_url(),
                cart_url: config.cart_url(),
            },
        );
        let reconciler = PaymentReconciler::new(
            ledger.clone(),
            carts.clone(),
            receipts.clone(),
            WebhookSettings {
                signing_secret: config.stripe_webhook_secret.clone(),
                tolerance_secs: config.webhook_tolerance_secs,
                budget: config.webhook_budget,
            },
        );

        Self {
            config: Arc::new(config),
            carts,
            ledger,
            checkout,
            reconciler,
            receipts,
        }
    }

    /// Production wiring: SQLite ledger and catalog, Stripe, SES or log receipts
    pub async fn new(config: Config) -> Result<Self, BoxError> {
        let db = DbService::new(&config.database_url).await?;

        let provider = StripeClient::new(
            &config.stripe_secret_key,
            &config.stripe_api_base,
            config.provider_timeout,
        )?;

        let receipts: Arc<dyn ReceiptDispatcher> = match &config.receipt_from_email {
            Some(from) => {
                tracing::info!(from = %from, "Receipts mailed via SES");
                Arc::new(SesReceiptDispatcher::from_env(from.clone()).await)
            }
            None => {
                tracing::info!("RECEIPT_FROM_EMAIL not set, receipts are only logged");
                Arc::new(LogReceiptDispatcher)
            }
        };

        let parts = Collaborators {
            catalog: Arc::new(SqlCatalog::new(db.pool.clone())),
            ledger_store: Arc::new(SqliteLedgerStore::new(db.pool)),
            provider: Arc::new(provider),
            receipts,
        };
        Ok(Self::assemble(config, parts))
    }
}
