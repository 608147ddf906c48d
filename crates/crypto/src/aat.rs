// Path: crates/crypto/src/aat.rs
//! Issuing and validating authenticated application tokens.

use crate::sign::eddsa::{verify_hex, Ed25519KeyPair};
use viper_types::app::{Aat, PublicKey, AAT_VERSION};
use viper_types::error::ViperError;

/// Issues a token delegating `requestor`'s relay budget to `client_pubkey`.
pub fn generate_aat(requestor: &Ed25519KeyPair, client_pubkey: &PublicKey) -> Result<Aat, ViperError> {
    let mut aat = Aat {
        version: AAT_VERSION.to_string(),
        requestor_pubkey: requestor.viper_public_key().to_hex(),
        client_pubkey: client_pubkey.to_hex(),
        requestor_signature: String::new(),
    };
    let digest = aat.signable_hash()?;
    aat.requestor_signature = requestor.sign_hex(&digest);
    Ok(aat)
}

/// Checks the version, both keys and the requestor signature.
pub fn validate_aat(aat: &Aat) -> Result<(), ViperError> {
    if !aat.is_supported_version() {
        return Err(ViperError::UnsupportedAatVersion(aat.version.clone()));
    }
    let requestor = aat.requestor_key()?;
    aat.client_key()?;
    if aat.requestor_signature.is_empty() {
        return Err(ViperError::InvalidSignature("missing requestor signature".into()));
    }
    let digest = aat.signable_hash()?;
    verify_hex(&requestor, &digest, &aat.requestor_signature)
        .map_err(|e| ViperError::InvalidSignature(format!("aat: {}", e)))
}
