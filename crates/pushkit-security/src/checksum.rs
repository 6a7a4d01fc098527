use sha2::{Digest, Sha256};

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.chars().all(|ch| ch.is_ascii_hexdigit())
}

/// Incremental digest for content that arrives in chunks.
#[derive(Default)]
pub struct Sha256Stream {
    hasher: Sha256,
}

impl Sha256Stream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    pub fn finish_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Stable bucket in `0..100` for a device and release, used for percentage
/// rollouts. The same client always lands in the same bucket for a label.
pub fn rollout_bucket(client_unique_id: &str, label: &str) -> u8 {
    let mut hasher = Sha256::new();
    hasher.update(client_unique_id.as_bytes());
    hasher.update(b":");
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    let value = u16::from_be_bytes([digest[0], digest[1]]);
    (value % 100) as u8
}
