//! Webhook signature verification and event payloads.
//!
//! The processor signs each delivery with a `Stripe-Signature` header of the
//! form `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`. Each `v1` value is an
//! HMAC-SHA256 of `"<t>.<raw body>"` keyed by the endpoint's signing secret.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Default maximum age of a signed delivery, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_INTENT_FAILED: &str = "payment_intent.payment_failed";

type HmacSha256 = Hmac<Sha256>;

/// Reasons a webhook delivery is rejected before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Missing signature header")]
    MissingHeader,

    #[error("Invalid signature header")]
    MalformedHeader,

    #[error("Webhook signature mismatch")]
    Mismatch,

    #[error("Webhook timestamp outside tolerance")]
    Stale,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

fn mac_for(payload: &[u8], secret: &str, timestamp: &str) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Verifies a delivery's signature header against the raw body.
///
/// Accepts the delivery if any `v1` entry matches and the signed timestamp is
/// within `tolerance_secs` of `now` (unix seconds).
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    let signed_at: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let mac = mac_for(payload, secret, timestamp)?;
    // Constant-time comparison via verify_slice.
    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    if now.abs_diff(signed_at) > tolerance_secs.unsigned_abs() {
        return Err(SignatureError::Stale);
    }

    Ok(())
}

/// Builds a signature header for `payload`, as the processor would send it.
///
/// Used by tests and local tooling that replay deliveries.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let timestamp = timestamp.to_string();
    let digest = match mac_for(payload, secret, &timestamp) {
        Ok(mac) => hex::encode(mac.finalize().into_bytes()),
        Err(_) => String::new(),
    };
    format!("t={timestamp},v1={digest}")
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// A verified webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    pub data: EventData,
}

impl WebhookEvent {
    /// Parses a raw delivery body.
    pub fn parse(payload: &[u8]) -> Result<Self, SignatureError> {
        serde_json::from_slice(payload).map_err(|e| SignatureError::InvalidPayload(e.to_string()))
    }

    /// Id of the object the event is about (the payment intent id).
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id")?.as_str()
    }

    /// String-valued metadata of the event's object. Non-string values are
    /// dropped.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        self.data
            .object
            .get("metadata")
            .and_then(serde_json::Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_735_689_600;

    fn body() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": "evt_1",
            "type": PAYMENT_INTENT_SUCCEEDED,
            "created": NOW,
            "data": { "object": {
                "id": "pi_1",
                "metadata": { "reservationId": "r-1", "guestId": "g-1", "amount": 5 }
            }}
        }))
        .unwrap()
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = body();
        let header = sign_payload(&payload, SECRET, NOW);
        assert_eq!(
            verify_signature(&payload, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW + 10),
            Ok(())
        );
    }

    #[test]
    fn accepts_any_matching_v1_entry() {
        let payload = body();
        let valid = sign_payload(&payload, SECRET, NOW);
        let digest = valid.split("v1=").nth(1).unwrap();
        let header = format!("t={NOW},v1=deadbeef,v1={digest}");
        assert!(verify_signature(&payload, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let payload = body();
        let header = sign_payload(&payload, SECRET, NOW);
        let mut tampered = payload.clone();
        tampered.push(b' ');
        assert_eq!(
            verify_signature(&tampered, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = body();
        let header = sign_payload(&payload, "whsec_other", NOW);
        assert_eq!(
            verify_signature(&payload, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = body();
        let header = sign_payload(&payload, SECRET, NOW - 301);
        assert_eq!(
            verify_signature(&payload, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn extreme_timestamps_are_stale() {
        let payload = body();
        for signed_at in [i64::MIN, i64::MAX] {
            let header = sign_payload(&payload, SECRET, signed_at);
            assert_eq!(
                verify_signature(&payload, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
                Err(SignatureError::Stale)
            );
        }
    }

    #[test]
    fn rejects_malformed_headers() {
        let payload = body();
        for header in ["", "v1=abcd", "t=now,v1=abcd", "t=1735689600"] {
            assert_eq!(
                verify_signature(&payload, header, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
                Err(SignatureError::MalformedHeader),
                "header {header:?}"
            );
        }
    }

    #[test]
    fn parses_event_and_string_metadata() {
        let event = WebhookEvent::parse(&body()).unwrap();
        assert_eq!(event.event_type, PAYMENT_INTENT_SUCCEEDED);
        assert_eq!(event.object_id(), Some("pi_1"));

        let metadata = event.metadata();
        assert_eq!(metadata.get("guestId").map(String::as_str), Some("g-1"));
        assert!(!metadata.contains_key("amount"));
    }

    #[test]
    fn unparseable_body_is_rejected() {
        assert!(matches!(
            WebhookEvent::parse(b"not json"),
            Err(SignatureError::InvalidPayload(_))
        ));
    }
}
