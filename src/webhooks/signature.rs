//! GitHub webhook signature verification using HMAC-SHA256.
//!
//! GitHub signs each delivery with a shared secret and puts the result in the
//! `X-Hub-Signature-256` header as `sha256=<hex>`. Verification happens
//! before any parsing; unverified bodies never reach the tracker.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a delivery signature against the raw payload and shared secret.
///
/// Accepts the full header value (`sha256=<hex>`). Returns false for
/// malformed headers, wrong algorithms, or mismatched digests; never panics.
/// The digest comparison is constant-time via the HMAC library.
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

/// Signs a payload the way GitHub would, returning a full header value.
///
/// Used by tests and local tooling to produce valid deliveries.
pub fn sign_payload(payload: &[u8], secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
