use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid Ed25519 public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid Ed25519 signature encoding: {0}")]
    InvalidSignature(String),
    #[error("Ed25519 signature does not match payload for key {key_id}")]
    Mismatch { key_id: String },
}

/// Verifies a hex-encoded detached Ed25519 signature over `payload`.
pub fn verify_detached_signature(
    payload: &[u8],
    public_key_hex: &str,
    signature_hex: &str,
) -> Result<(), SignatureError> {
    let public_key_hex = public_key_hex.trim();
    let key_bytes = hex::decode(public_key_hex)
        .map_err(|err| SignatureError::InvalidPublicKey(err.to_string()))?;
    let key_array: [u8; 32] = key_bytes.as_slice().try_into().map_err(|_| {
        SignatureError::InvalidPublicKey(format!("expected 32 bytes, got {}", key_bytes.len()))
    })?;
    let verifying_key = VerifyingKey::from_bytes(&key_array)
        .map_err(|err| SignatureError::InvalidPublicKey(err.to_string()))?;

    let signature_bytes = hex::decode(signature_hex.trim())
        .map_err(|err| SignatureError::InvalidSignature(err.to_string()))?;
    let signature_array: [u8; 64] = signature_bytes.as_slice().try_into().map_err(|_| {
        SignatureError::InvalidSignature(format!(
            "expected 64 bytes, got {}",
            signature_bytes.len()
        ))
    })?;
    let signature = Signature::from_bytes(&signature_array);

    verifying_key
        .verify(payload, &signature)
        .map_err(|_| SignatureError::Mismatch {
            key_id: public_key_hex.chars().take(16).collect(),
        })
}
