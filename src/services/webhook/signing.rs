//! DingTalk Robot Request Signing
//!
//! Robots with "additional signature" security verify two query parameters on
//! the webhook URL:
//!
//! - `timestamp`: Unix epoch milliseconds
//! - `sign`: percent-encoded Base64 of HMAC-SHA256(secret, "timestamp\nsecret")
//!
//! The construction must match DingTalk's verifier byte for byte.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::types::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Current time in epoch milliseconds, as DingTalk expects.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn string_to_sign(timestamp_ms: i64, secret: &str) -> String {
    format!("{}\n{}", timestamp_ms, secret)
}

/// Raw HMAC-SHA256 digest keyed with `secret`.
pub fn compute_digest(timestamp_ms: i64, secret: &str) -> Result<Vec<u8>, WebhookError> {
    if secret.is_empty() {
        return Err(WebhookError::SigningError("signing secret is empty".to_string()));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookError::SigningError(e.to_string()))?;
    mac.update(string_to_sign(timestamp_ms, secret).as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Standard Base64 of the digest, before URL escaping.
pub fn compute_signature(timestamp_ms: i64, secret: &str) -> Result<String, WebhookError> {
    let digest = compute_digest(timestamp_ms, secret)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(digest))
}

/// Append `timestamp` and `sign` to `webhook`. The input is left untouched.
pub fn sign_url(webhook: &str, secret: &str, timestamp_ms: i64) -> Result<String, WebhookError> {
    let signature = compute_signature(timestamp_ms, secret)?;
    let separator = if webhook.ends_with('?') || webhook.ends_with('&') {
        ""
    } else if webhook.contains('?') {
        "&"
    } else {
        "?"
    };

    Ok(format!(
        "{}{}timestamp={}&sign={}",
        webhook,
        separator,
        timestamp_ms,
        urlencoding::encode(&signature)
    ))
}
