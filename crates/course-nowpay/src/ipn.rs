//! # IPN Signature Verification
//!
//! NOWPayments pushes payment-status events (IPN) with an HMAC signature
//! in the `x-nowpayments-sig` header. Verification runs over the exact
//! bytes received, before any JSON parsing; an event that cannot be
//! verified is rejected as malformed and never reaches the reconciler.

use course_core::{MarketError, MarketResult, PaymentEvent};
use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the IPN signature
pub const SIGNATURE_HEADER: &str = "x-nowpayments-sig";

/// Compute the hex-encoded HMAC-SHA512 of a payload
pub fn compute_signature(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify an IPN signature against the raw payload bytes.
///
/// Comparison is constant-time over the decoded digests.
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> MarketResult<()> {
    let expected = compute_signature(secret, payload);
    if !constant_time_compare(signature, &expected) {
        return Err(MarketError::MalformedWebhook(
            "signature mismatch".to_string(),
        ));
    }
    Ok(())
}

/// Verify the signature header and parse the event, in that order.
///
/// `signature` is the raw header value; `None` (header absent) is treated
/// the same as a bad signature. Verification is mandatory.
pub fn verify_and_parse(
    secret: &str,
    payload: &[u8],
    signature: Option<&str>,
) -> MarketResult<PaymentEvent> {
    let signature = signature.ok_or_else(|| {
        MarketError::MalformedWebhook(format!("missing {} header", SIGNATURE_HEADER))
    })?;
    verify_signature(secret, payload, signature)?;
    PaymentEvent::from_slice(payload)
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
