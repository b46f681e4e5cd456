//! Admin order management

use axum::extract::{Path, Query, State};
use shared::ApiResponse;
use shared::models::{Order, OrderQuery, Paged};

use super::ApiResult;
use crate::state::AppState;

/// GET /api/admin/orders?status=&search=&sort=&page=&page_size=
pub async fn search_orders(
    State(state): State<AppState>,
    Query(mut query): Query<OrderQuery>,
) -> ApiResult<Paged<Order>> {
    query.page = query.page.max(1);
    query.page_size = query.page_size.clamp(1, 100);
    let page = state.ledger.search(&query).await?;
    Ok(ApiResponse::success(page))
}

/// POST /api/admin/orders/{id}/complete
pub async fn complete_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> ApiResult<Order> {
    let outcome = state.ledger.fulfil(order_id).await?;
    if !outcome.applied {
        tracing::info!(order_id, status = %outcome.status(), "Fulfil was a no-op");
    }
    Ok(ApiResponse::success(outcome.order))
}
