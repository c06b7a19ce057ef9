use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is missing")]
    Missing,

    #[error("signature header is not valid base64")]
    Encoding,

    #[error("store has no webhook secret configured")]
    NoSecret,

    #[error("signature does not match body")]
    Mismatch,
}

fn mac_for(secret: &[u8], body: &[u8]) -> Result<HmacSha256, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::NoSecret);
    }
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::NoSecret)?;
    mac.update(body);
    Ok(mac)
}

/// `base64(HMAC-SHA256(secret, body))`, as storefronts put it in the signature header.
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, SignatureError> {
    let mac = mac_for(secret, body)?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check `header` against the body's signature.
///
/// The comparison is constant-time (`verify_slice`).
pub fn verify(secret: &[u8], body: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
    let header = header.map(str::trim).filter(|h| !h.is_empty()).ok_or(SignatureError::Missing)?;
    let provided = STANDARD.decode(header).map_err(|_| SignatureError::Encoding)?;

    mac_for(secret, body)?
        .verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}
