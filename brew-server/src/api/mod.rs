//! API routes for brew-server

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod stripe_webhook;

use crate::auth::{identity_middleware, require_admin};
use crate::state::AppState;
use axum::routing::{delete, get, post, put};
use axum::{Router, middleware};
use shared::error::{ApiResponse, AppError};
use tower_http::trace::TraceLayer;

pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Admin only (role checked after identity)
    let admin = Router::new()
        .route("/api/admin/orders", get(admin::search_orders))
        .route(
            "/api/admin/orders/{id}/complete",
            post(admin::complete_order),
        )
        .layer(middleware::from_fn(require_admin));

    // Customer routes (JWT authenticated)
    let customer = Router::new()
        .route("/api/cart", get(cart::get_cart))
        .route("/api/cart/items", put(cart::upsert_item))
        .route("/api/cart/items/{product_id}", delete(cart::remove_item))
        .route("/api/checkout", post(checkout::initiate_checkout))
        .route("/checkout/success", get(checkout::success))
        .route("/api/orders", get(orders::list_orders))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/cancel", post(orders::cancel_order))
        .merge(admin)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ));

    // Stripe webhook (signature-verified, raw body)
    let webhook = Router::new().route("/stripe/webhook", post(stripe_webhook::handle_webhook));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/checkout/cancel", get(checkout::cancel))
        .merge(customer)
        .merge(webhook)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
