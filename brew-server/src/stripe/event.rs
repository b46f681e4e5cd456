//! Webhook event parsing
//!
//! Only payment completion events matter; everything else is acknowledged
//! and ignored so new provider event types never break delivery.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The session's payment is confirmed
    PaymentSucceeded {
        event_id: String,
        session_id: String,
        /// Order id the session was tagged with, if present
        order_id: Option<i64>,
    },
    Ignored {
        event_id: String,
        event_type: String,
    },
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawData,
}

#[derive(Deserialize)]
struct RawData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct CheckoutSession {
    id: String,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

impl CheckoutSession {
    fn order_id(&self) -> Option<i64> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("order_id"))
            .or(self.client_reference_id.as_ref())
            .and_then(|s| s.parse().ok())
    }
}

pub fn parse_event(payload: &[u8]) -> CoreResult<ProviderEvent> {
    let raw: RawEvent =
        serde_json::from_slice(payload).map_err(|e| CoreError::Malformed(e.to_string()))?;

    let completed = match raw.event_type.as_str() {
        // Delayed payment methods complete the session unpaid and succeed later
        "checkout.session.completed" => true,
        "checkout.session.async_payment_succeeded" => false,
        _ => {
            return Ok(ProviderEvent::Ignored {
                event_id: raw.id,
                event_type: raw.event_type,
            });
        }
    };

    let session: CheckoutSession = serde_json::from_value(raw.data.object)
        .map_err(|e| CoreError::Malformed(format!("{}: {e}", raw.event_type)))?;

    if completed && session.payment_status.as_deref() != Some("paid") {
        return Ok(ProviderEvent::Ignored {
            event_id: raw.id,
            event_type: format!(
                "{} ({})",
                raw.event_type,
                session.payment_status.as_deref().unwrap_or("no payment_status")
            ),
        });
    }

    Ok(ProviderEvent::PaymentSucceeded {
        event_id: raw.id,
        order_id: session.order_id(),
        session_id: session.id,
    })
}
