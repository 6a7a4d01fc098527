use anyhow::{Context, Result};
use pushkit_security::verify_detached_signature;

/// Checks the detached signature published next to a release history.
pub(crate) fn verify_history_signature(
    history_bytes: &[u8],
    public_key_hex: &str,
    signature_bytes: &[u8],
    location: &str,
) -> Result<()> {
    let signature_hex = std::str::from_utf8(signature_bytes)
        .with_context(|| format!("release history signature is not valid UTF-8: {location}"))?;
    verify_detached_signature(history_bytes, public_key_hex, signature_hex)
        .with_context(|| format!("release history signature rejected: {location}"))
}
