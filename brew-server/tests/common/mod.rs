//! Shared fakes and wiring for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use brew_server::ledger::{LedgerStore, MemoryLedgerStore};
use brew_server::payment::{PaymentProvider, PaymentSession, SessionRequest};
use brew_server::receipt::ReceiptDispatcher;
use brew_server::catalog::MemoryCatalog;
use brew_server::{AppState, Collaborators, Config, CoreError, CoreResult};
use rust_decimal_macros::dec;
use shared::models::{CustomerIdentity, Order, OrderQuery, OrderStatus, Paged, Product};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

pub const WEBHOOK_SECRET: &str = "whsec_integration";
pub const JWT_SECRET: &str = "jwt_integration";

pub fn test_config() -> Config {
    Config {
        environment: "test".into(),
        http_port: 0,
        database_url: "sqlite::memory:".into(),
        public_base_url: "https://brew.example".into(),
        stripe_secret_key: "sk_test".into(),
        stripe_webhook_secret: WEBHOOK_SECRET.into(),
        stripe_api_base: "https://stripe.invalid".into(),
        currency: "myr".into(),
        provider_timeout: Duration::from_secs(1),
        webhook_tolerance_secs: 300,
        webhook_budget: Duration::from_secs(5),
        cart_idle_ttl: Duration::from_secs(7200),
        orphan_timeout: Duration::from_secs(3600),
        sweep_interval: Duration::from_secs(300),
        jwt_secret: JWT_SECRET.into(),
        receipt_from_email: None,
        log_level: "debug".into(),
        log_dir: None,
    }
}

/// Hands out `cs_test_<n>` sessions, or fails on demand
#[derive(Default)]
pub struct FakeProvider {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_session(&self, request: &SessionRequest) -> CoreResult<PaymentSession> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::PaymentProvider("connection reset".into()));
        }
        Ok(PaymentSession {
            session_id: format!("cs_test_{}_{n}", request.order_id),
            redirect_url: format!("https://checkout.stripe.test/pay/{n}"),
        })
    }
}

#[derive(Default)]
pub struct CountingDispatcher {
    pub sent: AtomicUsize,
}

#[async_trait]
impl ReceiptDispatcher for CountingDispatcher {
    async fn send_receipt(&self, _order: &Order) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Memory ledger that counts every storage access except `count`.
/// Status writes can be slowed down with `set_write_delay`.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryLedgerStore,
    accesses: AtomicUsize,
    write_delay_ms: AtomicU64,
}

impl CountingStore {
    pub fn accesses(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }

    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn hit(&self) {
        self.accesses.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerStore for CountingStore {
    async fn insert(&self, order: &Order) -> CoreResult<()> {
        self.hit();
        self.inner.insert(order).await
    }

    async fn get(&self, order_id: i64) -> CoreResult<Option<Order>> {
        self.hit();
        self.inner.get(order_id).await
    }

    async fn find_by_session(&self, session_id: &str) -> CoreResult<Option<Order>> {
        self.hit();
        self.inner.find_by_session(session_id).await
    }

    async fn attach_session(&self, order_id: i64, session_id: &str) -> CoreResult<Option<String>> {
        self.hit();
        self.inner.attach_session(order_id, session_id).await
    }

    async fn compare_and_set_status(
        &self,
        order_id: i64,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> CoreResult<bool> {
        self.hit();
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.inner
            .compare_and_set_status(order_id, expected, next)
            .await
    }

    async fn list_for_customer(&self, customer: &CustomerIdentity) -> CoreResult<Vec<Order>> {
        self.hit();
        self.inner.list_for_customer(customer).await
    }

    async fn search(&self, query: &OrderQuery) -> CoreResult<Paged<Order>> {
        self.hit();
        self.inner.search(query).await
    }

    async fn pending_without_session(&self, created_before: i64) -> CoreResult<Vec<Order>> {
        self.hit();
        self.inner.pending_without_session(created_before).await
    }

    async fn count(&self) -> CoreResult<u64> {
        self.inner.count().await
    }
}

pub struct TestApp {
    pub state: AppState,
    pub catalog: Arc<MemoryCatalog>,
    pub store: Arc<CountingStore>,
    pub provider: Arc<FakeProvider>,
    pub receipts: Arc<CountingDispatcher>,
}

impl TestApp {
    pub async fn receipts_sent(&self) -> usize {
        self.state.receipts.flush().await;
        self.receipts.sent.load(Ordering::SeqCst)
    }
}

pub fn jasmine() -> Product {
    Product {
        id: 7,
        name: "Jasmine Milk Tea".into(),
        price_regular: dec!(6.90),
        price_large: dec!(8.50),
        is_available: true,
    }
}

/// Must run inside a tokio runtime (starts the receipt worker)
pub fn test_app() -> TestApp {
    test_app_with(test_config())
}

pub fn test_app_with(config: Config) -> TestApp {
    let catalog = Arc::new(MemoryCatalog::with_products([
        jasmine(),
        Product {
            id: 8,
            name: "Brown Sugar Latte".into(),
            price_regular: dec!(9.90),
            price_large: dec!(11.90),
            is_available: true,
        },
    ]));
    let store = Arc::new(CountingStore::default());
    let provider = Arc::new(FakeProvider::default());
    let receipts = Arc::new(CountingDispatcher::default());

    let state = AppState::assemble(
        config,
        Collaborators {
            catalog: catalog.clone(),
            ledger_store: store.clone(),
            provider: provider.clone(),
            receipts: receipts.clone(),
        },
    );

    TestApp {
        state,
        catalog,
        store,
        provider,
        receipts,
    }
}

pub fn amy() -> CustomerIdentity {
    CustomerIdentity::new("amy@example.com")
}

/// `checkout.session.completed` for a paid session
pub fn completed_event(event_id: &str, session_id: &str, order_id: i64) -> Vec<u8> {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "payment_status": "paid",
                "client_reference_id": order_id.to_string(),
                "metadata": { "order_id": order_id.to_string() }
            }
        }
    })
    .to_string()
    .into_bytes()
}

pub fn sign(payload: &[u8]) -> String {
    sign_with(payload, WEBHOOK_SECRET)
}

pub fn sign_with(payload: &[u8], secret: &str) -> String {
    let ts = chrono::Utc::now().timestamp();
    let sig = brew_server::stripe::compute_signature(payload, ts, secret).unwrap();
    format!("t={ts},v1={sig}")
}
