//! Checkout endpoints and the provider's browser redirects

use axum::{
    Extension,
    extract::{Query, State},
    response::Redirect,
};
use serde::{Deserialize, Serialize};
use shared::ApiResponse;

use super::ApiResult;
use crate::auth::Identity;
use crate::checkout::CheckoutStart;
use crate::state::AppState;

/// POST /api/checkout
pub async fn initiate_checkout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<CheckoutStart> {
    let start = state.checkout.initiate_checkout(&identity.customer).await?;
    Ok(ApiResponse::success(start))
}

#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentConfirmed {
    pub order_id: i64,
}

/// GET /checkout/success?session_id=
pub async fn success(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<SuccessQuery>,
) -> ApiResult<PaymentConfirmed> {
    let order_id = state
        .checkout
        .handle_success_redirect(&identity.customer, query.session_id.as_deref())
        .await?;
    Ok(ApiResponse::success(PaymentConfirmed { order_id }))
}

/// GET /checkout/cancel
pub async fn cancel(State(state): State<AppState>) -> Redirect {
    Redirect::to(state.checkout.handle_cancel_redirect())
}
