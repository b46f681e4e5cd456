//! Cart endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::ApiResponse;
use shared::error::{AppError, ErrorCode};
use shared::models::{CartSnapshot, Customizations, Size};

use super::ApiResult;
use crate::auth::Identity;
use crate::state::AppState;

/// PUT /api/cart/items
#[derive(Debug, Deserialize)]
pub struct UpsertItem {
    pub product_id: i64,
    pub size: String,
    #[serde(default)]
    pub ice_level: String,
    #[serde(default)]
    pub sugar_level: String,
    pub quantity: i32,
}

pub async fn get_cart(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<CartSnapshot> {
    let snapshot = state.carts.snapshot(&identity.customer).await?;
    Ok(ApiResponse::success(snapshot))
}

pub async fn upsert_item(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<UpsertItem>,
) -> ApiResult<CartSnapshot> {
    let size: Size = req
        .size
        .parse::<Size>()
        .map_err(|e| {
            AppError::with_message(ErrorCode::InvalidSize, e.to_string())
                .with_detail("size", req.size.clone())
        })?;

    state
        .carts
        .upsert(
            &identity.customer,
            req.product_id,
            size,
            Customizations::new(req.ice_level, req.sugar_level),
            req.quantity,
        )
        .await?;

    let snapshot = state.carts.snapshot(&identity.customer).await?;
    Ok(ApiResponse::success(snapshot))
}

/// DELETE /api/cart/items/{product_id}
pub async fn remove_item(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(product_id): Path<i64>,
) -> ApiResult<CartSnapshot> {
    state.carts.remove(&identity.customer, product_id);
    let snapshot = state.carts.snapshot(&identity.customer).await?;
    Ok(ApiResponse::success(snapshot))
}
