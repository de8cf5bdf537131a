use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Derive the keyed authentication token for `message`.
///
/// HMAC-SHA256 over the raw message bytes, lowercase hex. The collector
/// recomputes this over the received payload and the shared key, so the
/// payload bytes must reach it exactly as they were signed.
///
/// Also used once at provisioning time to derive the node id from the
/// key and a pid+timestamp nonce.
pub fn token(key: &str, message: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}
