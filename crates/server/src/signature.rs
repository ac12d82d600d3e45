//! GitHub webhook signature verification.
//!
//! GitHub signs each webhook delivery with HMAC-SHA256 over the raw body,
//! using the shared webhook secret, and sends the result in the
//! `X-Hub-Signature-256` header as `sha256=<hex>`. Verification happens
//! before the payload is parsed; invalid signatures are rejected outright.

use hmac::{Hmac, Mac};
use sha2::Sha256;

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a webhook signature header against the payload and secret.
///
/// The comparison is constant-time. Malformed headers (missing prefix, bad
/// hex) fail closed; this function never panics.
///
/// # Arguments
///
/// * `payload` - The raw webhook body bytes
/// * `signature_header` - The value of the `X-Hub-Signature-256` header
/// * `secret` - The webhook secret configured in GitHub
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(hex_digest) = signature_header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);

    mac.verify_slice(&expected).is_ok()
}

/// Computes the signature header value GitHub would send for a payload.
pub fn signature_header(payload: &[u8], secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any size");
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
