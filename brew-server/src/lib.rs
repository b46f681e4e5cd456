//! brew-server: checkout-to-order reconciliation for the drinks storefront
//!
//! - Session-scoped carts priced from the catalog at read time
//! - A durable order ledger with an idempotent status state machine
//! - Checkout against Stripe Checkout Sessions
//! - Payment confirmation from both the browser redirect and the signed
//!   webhook, reconciled into a single `Paid` transition

pub mod api;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod payment;
pub mod pricing;
pub mod receipt;
pub mod reconciler;
pub mod state;
pub mod stripe;
pub mod sweep;
pub mod utils;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use state::{AppState, Collaborators};
