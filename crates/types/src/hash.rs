// Path: crates/types/src/hash.rs
//! The canonical hash function used for addresses, session keys, leaves and
//! signature payloads.

use sha2::{Digest, Sha256};

/// A 32-byte digest.
pub type Hash32 = [u8; 32];

/// Computes the SHA-256 digest of `data`.
pub fn sha256(data: impl AsRef<[u8]>) -> Hash32 {
    Sha256::digest(data.as_ref()).into()
}

/// Computes the SHA-256 digest of several byte slices as if they were concatenated.
pub fn sha256_concat(parts: &[&[u8]]) -> Hash32 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
