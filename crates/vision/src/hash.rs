use sha2::{Digest, Sha256};

/// Compute SHA-256 of an in-memory byte slice.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Lowercase hex (64 chars) SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    sha256_bytes(data).iter().map(|b| format!("{b:02x}")).collect()
}
