// Path: crates/types/src/app/aat.rs
//! The authenticated application token (AAT): a requestor's signed permission
//! for a client key to spend the requestor's relay budget.

use super::{Hash32, PublicKey};
use crate::codec::canonical_json_hash;
use crate::error::ViperError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Token versions accepted by relay and proof validation.
pub const SUPPORTED_AAT_VERSIONS: &[&str] = &["0.0.1"];

/// The current token version.
pub const AAT_VERSION: &str = "0.0.1";

/// An authenticated application token. Keys and signature are hex strings.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Aat {
    /// The token format version.
    pub version: String,
    /// The requestor that issued the token.
    pub requestor_pubkey: String,
    /// The client key the token delegates to.
    pub client_pubkey: String,
    /// The requestor's signature over the token with this field blanked.
    pub requestor_signature: String,
}

impl Aat {
    /// SHA-256 of the canonical JSON of the token with the signature blanked.
    pub fn signable_hash(&self) -> Result<Hash32, ViperError> {
        let mut unsigned = self.clone();
        unsigned.requestor_signature = String::new();
        canonical_json_hash(&unsigned).map_err(ViperError::Serialization)
    }

    /// The requestor key, parsed.
    pub fn requestor_key(&self) -> Result<PublicKey, ViperError> {
        PublicKey::from_hex(&self.requestor_pubkey).map_err(ViperError::InvalidPubKey)
    }

    /// The client key, parsed.
    pub fn client_key(&self) -> Result<PublicKey, ViperError> {
        PublicKey::from_hex(&self.client_pubkey).map_err(ViperError::InvalidPubKey)
    }

    /// Whether `version` is in the supported list.
    pub fn is_supported_version(&self) -> bool {
        SUPPORTED_AAT_VERSIONS.contains(&self.version.as_str())
    }
}
