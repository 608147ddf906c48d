// Path: crates/crypto/src/key_store.rs
//! Node key files.
//!
//! Format: the 32-byte Ed25519 seed as lowercase hex, optionally followed by a
//! newline. Failures surface as `ViperError::KeybaseError` at the node.

use crate::error::CryptoError;
use crate::sign::eddsa::Ed25519KeyPair;
use crate::sign::{SerializableKey, SigningKeyPair};
use std::path::Path;

/// Reads a key pair from a hex seed file.
pub fn load_key_file(path: &Path) -> Result<Ed25519KeyPair, CryptoError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CryptoError::KeyFile(format!("failed to read {}: {}", path.display(), e)))?;
    let bytes = hex::decode(raw.trim())
        .map_err(|e| CryptoError::KeyFile(format!("{} is not hex: {}", path.display(), e)))?;
    let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        CryptoError::KeyFile(format!(
            "{} holds {} bytes, expected a 32-byte seed",
            path.display(),
            bytes.len()
        ))
    })?;
    Ok(Ed25519KeyPair::from_seed(&seed))
}

/// Writes a key pair's seed to `path`, creating parent directories.
pub fn write_key_file(path: &Path, keypair: &Ed25519KeyPair) -> Result<(), CryptoError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CryptoError::KeyFile(format!("failed to create {}: {}", parent.display(), e)))?;
    }
    let seed = keypair.private_key().to_bytes();
    std::fs::write(path, format!("{}\n", hex::encode(seed)))
        .map_err(|e| CryptoError::KeyFile(format!("failed to write {}: {}", path.display(), e)))
}

/// Loads the key at `path`, generating and persisting a fresh one if absent.
pub fn load_or_generate(path: &Path) -> Result<Ed25519KeyPair, CryptoError> {
    if path.exists() {
        return load_key_file(path);
    }
    let keypair = Ed25519KeyPair::generate();
    write_key_file(path, &keypair)?;
    tracing::info!(target: "keys", path = %path.display(), address = %keypair.address(), "generated node key");
    Ok(keypair)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_load_preserves_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("node_key.hex");
        let keypair = Ed25519KeyPair::from_seed(&[11; 32]);
        write_key_file(&path, &keypair).unwrap();
        let loaded = load_key_file(&path).unwrap();
        assert_eq!(loaded.viper_public_key(), keypair.viper_public_key());
    }

    #[test]
    fn malformed_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let short = dir.path().join("short.hex");
        std::fs::write(&short, "abcd").unwrap();
        assert!(matches!(load_key_file(&short), Err(CryptoError::KeyFile(_))));

        let garbage = dir.path().join("garbage.hex");
        std::fs::write(&garbage, "not a key").unwrap();
        assert!(load_key_file(&garbage).is_err());

        assert!(load_key_file(&dir.path().join("missing.hex")).is_err());
    }

    #[test]
    fn load_or_generate_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node_key.hex");
        let first = load_or_generate(&path).unwrap();
        let second = load_or_generate(&path).unwrap();
        assert_eq!(first.address(), second.address());
    }
}
