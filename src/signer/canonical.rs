//! Canonical request bodies and their HMAC-SHA256 signatures.
//!
//! Canonical form: compact JSON, object keys sorted at every depth, `/` and
//! non-ASCII characters left unescaped. A verifier holding the shared secret
//! reproduces the signature by applying the same rule to the received body.

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-AFFCD-Signature";
pub const TIMESTAMP_HEADER: &str = "X-AFFCD-Timestamp";
pub const SITE_HEADER: &str = "X-AFFCD-Site";

/// Static user agent sent with every signed call.
pub const USER_AGENT: &str = concat!("AFFCD-Satellite/", env!("CARGO_PKG_VERSION"));

/// Serialize `payload` deterministically.
pub fn canonicalize(payload: &Map<String, Value>) -> Vec<u8> {
    let sorted = sort_keys(&Value::Object(payload.clone()));
    sorted.to_string().into_bytes()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(ordered.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Hex-encoded HMAC-SHA256 of `body` under `secret` (64 chars, untruncated).
pub fn sign(body: &[u8], secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC key length is always valid");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Header set for a signed call made at `timestamp`.
///
/// The signature covers `body` only; the timestamp and site headers travel
/// alongside it unsigned.
pub fn build_headers(
    body: &[u8],
    site_id: &str,
    secret: &[u8],
    timestamp: i64,
) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("Content-Type", "application/json".to_string()),
        ("User-Agent", USER_AGENT.to_string()),
        (SIGNATURE_HEADER, sign(body, secret)),
        (TIMESTAMP_HEADER, timestamp.to_string()),
        (SITE_HEADER, site_id.to_string()),
    ])
}
