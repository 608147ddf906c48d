// Path: crates/crypto/src/sign/eddsa/mod.rs
//! Ed25519 keys and signatures over `ed25519-dalek`.

use crate::error::CryptoError;
use crate::sign::{SerializableKey, Signature, SigningKey, SigningKeyPair, VerifyingKey};
use ed25519_dalek::{Signer, Verifier};
use rand::rngs::OsRng;
use viper_types::app::{Address, PublicKey};

/// Ed25519 key pair implementation
#[derive(Clone)]
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

/// Ed25519 signature implementation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ed25519Signature(ed25519_dalek::Signature);

/// Ed25519 public key implementation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey(ed25519_dalek::VerifyingKey);

/// Ed25519 private key implementation
#[derive(Clone)]
pub struct Ed25519PrivateKey(ed25519_dalek::SigningKey);

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519KeyPair")
            .field("public_key", &hex::encode(self.signing_key.verifying_key().as_bytes()))
            .finish_non_exhaustive()
    }
}

impl Ed25519KeyPair {
    /// Generate a new Ed25519 key pair
    pub fn generate() -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut OsRng),
        }
    }

    /// Derives a key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Create from an existing private key
    pub fn from_private_key(private_key: &Ed25519PrivateKey) -> Self {
        Self {
            signing_key: private_key.0.clone(),
        }
    }

    /// The raw public key as used in wire types.
    pub fn viper_public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// The address of this key pair.
    pub fn address(&self) -> Address {
        self.viper_public_key().address()
    }

    /// Signs `message` and returns the hex-encoded signature.
    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(self.signing_key.sign(message).to_bytes())
    }
}

impl SigningKeyPair for Ed25519KeyPair {
    type PublicKey = Ed25519PublicKey;
    type PrivateKey = Ed25519PrivateKey;
    type Signature = Ed25519Signature;

    fn public_key(&self) -> Self::PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key())
    }

    fn private_key(&self) -> Self::PrivateKey {
        Ed25519PrivateKey(self.signing_key.clone())
    }

    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError> {
        Ok(Ed25519Signature(self.signing_key.sign(message)))
    }
}

impl VerifyingKey for Ed25519PublicKey {
    type Signature = Ed25519Signature;

    fn verify(&self, message: &[u8], signature: &Self::Signature) -> Result<(), CryptoError> {
        self.0
            .verify(message, &signature.0)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))
    }
}

impl SerializableKey for Ed25519PublicKey {
    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "Invalid public key length: expected 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        ed25519_dalek::VerifyingKey::from_bytes(&arr)
            .map(Ed25519PublicKey)
            .map_err(|e| CryptoError::InvalidKey(format!("Failed to parse public key: {}", e)))
    }
}

impl SigningKey for Ed25519PrivateKey {
    type Signature = Ed25519Signature;

    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError> {
        Ok(Ed25519Signature(self.0.sign(message)))
    }
}

impl SerializableKey for Ed25519PrivateKey {
    fn to_bytes(&self) -> Vec<u8> {
        // Export just the seed (32 bytes)
        self.0.to_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let seed: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey("Invalid private key length: expected 32 bytes".to_string())
        })?;
        Ok(Ed25519PrivateKey(ed25519_dalek::SigningKey::from_bytes(&seed)))
    }
}

impl SerializableKey for Ed25519Signature {
    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        ed25519_dalek::Signature::from_slice(bytes)
            .map(Ed25519Signature)
            .map_err(|e| CryptoError::InvalidSignature(format!("Failed to parse signature: {}", e)))
    }
}

impl Signature for Ed25519Signature {}

impl Ed25519PublicKey {
    /// Parses a wire public key.
    pub fn from_viper(pk: &PublicKey) -> Result<Self, CryptoError> {
        Self::from_bytes(&pk.0)
    }
}

impl Ed25519PrivateKey {
    /// Get the public key corresponding to this private key
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.0.verifying_key())
    }
}

/// Verifies a hex-encoded signature over `message` under a wire public key.
pub fn verify_hex(pk: &PublicKey, message: &[u8], signature_hex: &str) -> Result<(), CryptoError> {
    let sig_bytes = hex::decode(signature_hex)
        .map_err(|e| CryptoError::InvalidSignature(format!("signature is not hex: {}", e)))?;
    let signature = Ed25519Signature::from_bytes(&sig_bytes)?;
    Ed25519PublicKey::from_viper(pk)?.verify(message, &signature)
}

#[cfg(test)]
mod tests;
