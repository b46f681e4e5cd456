//! Stripe integration via REST API (no SDK dependency)

mod event;

pub use event::{ProviderEvent, parse_event};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use crate::payment::{PaymentProvider, PaymentSession, SessionRequest};

/// Checkout Sessions client
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: &str, api_base: &str, timeout: Duration) -> CoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::PaymentProvider(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            secret_key: secret_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

/// Form fields for `POST /v1/checkout/sessions` (payment mode)
fn session_form(request: &SessionRequest) -> Vec<(String, String)> {
    let order_id = request.order_id.to_string();
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[]".to_string(), "card".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("client_reference_id".to_string(), order_id.clone()),
        ("metadata[order_id]".to_string(), order_id),
    ];
    for (i, line) in request.lines.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            request.currency.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            line.description.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            line.unit_amount.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), line.quantity.to_string()));
    }
    form
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_session(&self, request: &SessionRequest) -> CoreResult<PaymentSession> {
        let resp = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&session_form(request))
            .send()
            .await
            .map_err(|e| CoreError::PaymentProvider(format!("request failed: {e}")))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CoreError::PaymentProvider(format!("unreadable response: {e}")))?;

        if !status.is_success() {
            let message = body["error"]["message"].as_str().unwrap_or("unknown error");
            return Err(CoreError::PaymentProvider(format!(
                "Stripe create_checkout failed ({status}): {message}"
            )));
        }

        match (body["id"].as_str(), body["url"].as_str()) {
            (Some(id), Some(url)) => Ok(PaymentSession {
                session_id: id.to_string(),
                redirect_url: url.to_string(),
            }),
            _ => Err(CoreError::PaymentProvider(format!(
                "Stripe create_checkout returned no session: {body}"
            ))),
        }
    }
}

/// Sign a payload the way Stripe does: hex HMAC-SHA256 over `"{t}.{payload}"`
pub fn compute_signature(payload: &[u8], timestamp: i64, secret: &str) -> Result<String, &'static str> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a `Stripe-Signature` header (`t=...,v1=...[,v1=...]`).
///
/// Any `v1` entry may match; comparison is constant time. Timestamps further
/// than `tolerance_secs` from `now` are rejected as replays.
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), &'static str> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    let timestamp = timestamp.ok_or("Invalid Stripe-Signature header")?;
    if signatures.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // hmac::verify_slice is constant time; clone per candidate
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err("Webhook signature mismatch");
    }

    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if now.abs_diff(ts) > tolerance_secs.unsigned_abs() {
        return Err("Webhook timestamp outside tolerance");
    }

    Ok(())
}
