// SPDX-License-Identifier: MIT

//! Stripe API client and webhook event handling.
//!
//! Handles:
//! - Hosted checkout session creation (form-encoded REST calls)
//! - Webhook signature verification (`Stripe-Signature` header)
//! - Event envelope parsing for the reconciler

use crate::error::AppError;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_BASE_URL: &str = "https://api.stripe.com/v1";

/// Reject webhook timestamps older than this (replay protection).
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Checkout mode for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    /// Recurring subscription (monthly Elite)
    Subscription,
    /// One-time purchase (lifetime Elite)
    Payment,
}

impl CheckoutMode {
    fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Subscription => "subscription",
            CheckoutMode::Payment => "payment",
        }
    }
}

/// A created hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted payment page URL to redirect the browser to
    pub url: Option<String>,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    /// Create a new Stripe client with an API secret key.
    pub fn new(secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            secret_key,
        }
    }

    /// Override the API base URL (stripe-mock / tests).
    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            secret_key,
        }
    }

    /// Create a hosted checkout session for a plan.
    ///
    /// `client_reference_id` carries the user's uid and `metadata[planoId]`
    /// the plan, so the webhook reconciler can attribute the purchase.
    pub async fn create_checkout_session(
        &self,
        price_id: &str,
        mode: CheckoutMode,
        uid: &str,
        plano_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, AppError> {
        let url = format!("{}/checkout/sessions", self.base_url);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("mode", mode.as_str()),
                ("line_items[0][price]", price_id),
                ("line_items[0][quantity]", "1"),
                ("client_reference_id", uid),
                ("metadata[planoId]", plano_id),
                ("success_url", success_url),
                ("cancel_url", cancel_url),
            ])
            .send()
            .await
            .map_err(|e| AppError::Stripe(format!("Checkout session request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Stripe(format!(
                "Checkout session creation returned {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Stripe(format!("Invalid checkout session JSON: {}", e)))
    }
}

// ─── Webhook Events ──────────────────────────────────────────────

/// Parsed webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    /// The event's primary object (session, subscription, ...), kept as
    /// raw JSON since each event type carries a different shape.
    pub object: serde_json::Value,
}

/// Webhook signature verification failure.
#[derive(Debug, thiserror::Error)]
pub enum WebhookVerifyError {
    #[error("malformed Stripe-Signature header")]
    MalformedHeader,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("timestamp outside tolerance")]
    StaleTimestamp,
    #[error("payload is not a valid event envelope")]
    InvalidPayload,
}

/// Verify a webhook payload against its `Stripe-Signature` header.
///
/// The header carries `t=<unix>,v1=<hex hmac>`; the MAC covers
/// `"{t}.{payload}"` with the endpoint's signing secret.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<(), WebhookVerifyError> {
    let (timestamp, candidates) = parse_signature_header(signature_header)?;

    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(WebhookVerifyError::StaleTimestamp);
    }

    for candidate in &candidates {
        let Ok(expected) = hex::decode(candidate) else {
            continue;
        };

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| WebhookVerifyError::SignatureMismatch)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);

        // verify_slice is constant-time
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(WebhookVerifyError::SignatureMismatch)
}

/// Verify the signature and parse the event envelope.
pub fn construct_event(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
) -> Result<StripeEvent, WebhookVerifyError> {
    let now = chrono::Utc::now().timestamp();
    verify_webhook_signature(payload, signature_header, secret, now)?;

    serde_json::from_slice(payload).map_err(|_| WebhookVerifyError::InvalidPayload)
}

/// Split the header into its timestamp and `v1` signature candidates.
///
/// Stripe may send multiple `v1` entries during secret rotation.
fn parse_signature_header(header: &str) -> Result<(i64, Vec<String>), WebhookVerifyError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates = Vec::new();

    for part in header.split(',') {
        let part = part.trim();
        if let Some(raw) = part.strip_prefix("t=") {
            timestamp = raw.parse().ok();
        } else if let Some(raw) = part.strip_prefix("v1=") {
            candidates.push(raw.to_string());
        }
    }

    let timestamp = timestamp.ok_or(WebhookVerifyError::MalformedHeader)?;
    if candidates.is_empty() {
        return Err(WebhookVerifyError::MalformedHeader);
    }

    Ok((timestamp, candidates))
}

/// Build a `Stripe-Signature` header for a payload (test helper).
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let signature = mac.finalize().into_bytes();

    format!("t={},v1={}", timestamp, hex::encode(signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    #[test]
    fn signature_round_trip() {
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let now = 1_755_000_000;

        let header = sign_payload(payload, SECRET, now);
        assert!(verify_webhook_signature(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn signature_rejects_tampered_payload() {
        let payload = br#"{"id":"evt_1"}"#;
        let now = 1_755_000_000;

        let header = sign_payload(payload, SECRET, now);
        let err = verify_webhook_signature(br#"{"id":"evt_2"}"#, &header, SECRET, now).unwrap_err();
        assert!(matches!(err, WebhookVerifyError::SignatureMismatch));
    }

    #[test]
    fn signature_rejects_wrong_secret() {
        let payload = br#"{"id":"evt_1"}"#;
        let now = 1_755_000_000;

        let header = sign_payload(payload, "whsec_other", now);
        let err = verify_webhook_signature(payload, &header, SECRET, now).unwrap_err();
        assert!(matches!(err, WebhookVerifyError::SignatureMismatch));
    }

    #[test]
    fn signature_rejects_stale_timestamp() {
        let payload = br#"{"id":"evt_1"}"#;
        let sent_at = 1_755_000_000;

        let header = sign_payload(payload, SECRET, sent_at);
        let err = verify_webhook_signature(payload, &header, SECRET, sent_at + 600).unwrap_err();
        assert!(matches!(err, WebhookVerifyError::StaleTimestamp));
    }

    #[test]
    fn signature_accepts_rotated_secret_entry() {
        let payload = br#"{"id":"evt_1"}"#;
        let now = 1_755_000_000;

        // Two v1 entries: one from the old secret, one from the current
        let old = sign_payload(payload, "whsec_old", now);
        let current = sign_payload(payload, SECRET, now);
        let v1_current = current.split("v1=").nth(1).unwrap();
        let combined = format!("{},v1={}", old, v1_current);

        assert!(verify_webhook_signature(payload, &combined, SECRET, now).is_ok());
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let payload = br#"{}"#;
        assert!(matches!(
            verify_webhook_signature(payload, "", SECRET, 0).unwrap_err(),
            WebhookVerifyError::MalformedHeader
        ));
        assert!(matches!(
            verify_webhook_signature(payload, "t=123", SECRET, 123).unwrap_err(),
            WebhookVerifyError::MalformedHeader
        ));
        assert!(matches!(
            verify_webhook_signature(payload, "v1=abcd", SECRET, 0).unwrap_err(),
            WebhookVerifyError::MalformedHeader
        ));
    }

    #[test]
    fn event_envelope_parses() {
        let payload = br#"{
            "id": "evt_123",
            "type": "checkout.session.completed",
            "data": { "object": { "client_reference_id": "U1" } }
        }"#;
        let now = chrono::Utc::now().timestamp();

        let header = sign_payload(payload, SECRET, now);
        let event = construct_event(payload, &header, SECRET).unwrap();

        assert_eq!(event.id, "evt_123");
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(
            event.data.object.get("client_reference_id").unwrap(),
            "U1"
        );
    }
}
