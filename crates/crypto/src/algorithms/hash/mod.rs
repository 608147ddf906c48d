// Path: crates/crypto/src/algorithms/hash/mod.rs
//! The canonical hash function and the derivations built on it.

use crate::error::CryptoError;
use viper_types::app::{Address, PublicKey};

pub use viper_types::hash::{sha256, sha256_concat, Hash32};

/// Derives an address from a raw public key: the first 20 bytes of its SHA-256 digest.
pub fn address_from_pubkey(pk: &PublicKey) -> Address {
    pk.address()
}

/// Parses a hex-encoded 32-byte digest.
pub fn hash_from_hex(s: &str) -> Result<Hash32, CryptoError> {
    let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidHashLength {
            expected: 32,
            got: len,
        })
}
