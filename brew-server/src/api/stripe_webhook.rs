//! Stripe webhook handler
//!
//! POST /stripe/webhook. Takes the raw body, which the signature covers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use shared::error::AppError;

use crate::error::CoreError;
use crate::state::AppState;

/// Handle incoming Stripe webhook events
///
/// - rejected signature or unparseable payload: bare 400, nothing else
/// - no order for the session: 200, so the provider stops redelivering
/// - storage failure or timeout: error status, the provider redelivers
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let sig_header = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok());

    match state
        .reconciler
        .handle_provider_notification(&body, sig_header)
        .await
    {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(e) if e.is_webhook_rejection() => {
            if let CoreError::Malformed(reason) = &e {
                tracing::warn!(%reason, "Malformed webhook payload");
            }
            StatusCode::BAD_REQUEST.into_response()
        }
        Err(CoreError::NotFound(what)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "result": "unmatched", "detail": what })),
        )
            .into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}
