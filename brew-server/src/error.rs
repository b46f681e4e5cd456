//! Core error type for brew-server
//!
//! `CoreError` is what the cart, ledger, checkout and reconciler layers return.
//! It converts into the shared `AppError` at the HTTP boundary, where each
//! variant gets its numbered `ErrorCode`.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};
use shared::models::OrderStatus;
use thiserror::Error;

/// Errors raised by the checkout-to-order core
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Product {0} is unavailable")]
    ProductUnavailable(i64),

    #[error("Order {order_id} already has payment session {existing}")]
    AlreadyAttached { order_id: i64, existing: String },

    #[error("Order {order_id} is {status}, cannot {action}")]
    InvalidState {
        order_id: i64,
        status: OrderStatus,
        action: &'static str,
    },

    #[error("Order {0} belongs to another customer")]
    Forbidden(i64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Webhook rejected: {0}")]
    UnauthenticatedWebhook(&'static str),

    #[error("Malformed webhook payload: {0}")]
    Malformed(String),

    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Timed out: {0}")]
    Timeout(&'static str),
}

impl CoreError {
    pub fn order_not_found(order_id: i64) -> Self {
        CoreError::NotFound(format!("order {order_id}"))
    }

    pub fn session_not_found(session_id: &str) -> Self {
        CoreError::NotFound(format!("payment session {session_id}"))
    }

    /// Webhook errors that must be answered with a bare rejection
    pub fn is_webhook_rejection(&self) -> bool {
        matches!(
            self,
            CoreError::UnauthenticatedWebhook(_) | CoreError::Malformed(_)
        )
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::Storage(e.to_string())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyCart => AppError::new(ErrorCode::CartEmpty),
            CoreError::ProductUnavailable(product_id) => {
                AppError::new(ErrorCode::ProductUnavailable).with_detail("product_id", product_id)
            }
            CoreError::AlreadyAttached { order_id, .. } => {
                AppError::new(ErrorCode::PaymentSessionConflict).with_detail("order_id", order_id)
            }
            e @ CoreError::InvalidState { .. } => {
                AppError::with_message(ErrorCode::OrderInvalidState, e.to_string())
            }
            CoreError::Forbidden(_) => AppError::permission_denied("Order belongs to another customer"),
            CoreError::NotFound(what) => {
                AppError::with_message(ErrorCode::OrderNotFound, format!("Not found: {what}"))
            }
            // No detail leaves the webhook boundary
            CoreError::UnauthenticatedWebhook(_) | CoreError::Malformed(_) => {
                AppError::new(ErrorCode::WebhookRejected)
            }
            CoreError::PaymentProvider(e) => {
                tracing::warn!(error = %e, "Payment provider failure");
                AppError::new(ErrorCode::PaymentProviderError)
            }
            CoreError::Storage(e) => {
                tracing::error!(error = %e, "Ledger storage error");
                AppError::new(ErrorCode::DatabaseError)
            }
            CoreError::Timeout(what) => {
                tracing::warn!(operation = what, "Operation exceeded its budget");
                AppError::new(ErrorCode::TimeoutError)
            }
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
