mod checksum;
mod ed25519;

pub use checksum::{is_sha256_hex, rollout_bucket, sha256_hex, Sha256Stream};
pub use ed25519::{verify_detached_signature, SignatureError};
