//! Order history endpoints

use axum::{
    Extension,
    extract::{Path, State},
};
use shared::ApiResponse;
use shared::models::Order;

use super::ApiResult;
use crate::auth::Identity;
use crate::error::CoreError;
use crate::state::AppState;

/// GET /api/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Vec<Order>> {
    let orders = state.ledger.list_for_customer(&identity.customer).await?;
    Ok(ApiResponse::success(orders))
}

/// GET /api/orders/{id}
///
/// Owners see their own orders; admins see any.
pub async fn get_order(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(order_id): Path<i64>,
) -> ApiResult<Order> {
    let order = state.ledger.get(order_id).await?;
    if !order.is_owned_by(&identity.customer) && !identity.role.is_admin() {
        // Same answer as a missing order
        return Err(CoreError::order_not_found(order_id).into());
    }
    Ok(ApiResponse::success(order))
}

/// POST /api/orders/{id}/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(order_id): Path<i64>,
) -> ApiResult<Order> {
    let order = state.ledger.cancel(order_id, &identity.customer).await?;
    Ok(ApiResponse::success(order))
}
