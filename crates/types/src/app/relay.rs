// Path: crates/types/src/app/relay.rs
//! Relays, relay proofs and relay responses as they travel between clients,
//! servicers and fishermen.

use super::{hex_serde, Aat, Address, Hash32, PublicKey, SessionHeader};
use crate::codec::canonical_json_hash;
use crate::error::ViperError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The opaque RPC call forwarded to the external chain.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload {
    /// The request body, forwarded verbatim.
    #[serde(default)]
    pub data: String,
    /// The HTTP method; POST when empty.
    #[serde(default)]
    pub method: String,
    /// Appended to the hosted chain URL.
    #[serde(default)]
    pub path: String,
    /// Copied onto the outbound request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Relay metadata signed together with the payload.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq, Default)]
pub struct RelayMeta {
    /// The client's view of the chain height.
    pub block_height: u64,
    /// Set on fisherman sample relays: the session under audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audited_session: Option<SessionHeader>,
}

/// The signed commitment a servicer accumulates as evidence of one relay.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelayProof {
    /// Client-chosen nonce; unique within a session.
    pub entropy: u64,
    /// The session the relay belongs to.
    pub session_block_height: u64,
    /// The servicer the relay is addressed to.
    pub servicer_pubkey: PublicKey,
    /// The external chain identifier.
    pub chain: String,
    /// The token authorizing the client.
    pub aat: Aat,
    /// `sha256(canonical_json({payload, meta}))`.
    #[serde(with = "hex_serde::hash32")]
    pub request_hash: Hash32,
    /// Mirrors `SessionHeader::geo_zone` of the dispatched session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_zone: Option<String>,
    /// Mirrors `SessionHeader::num_servicers` of the dispatched session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_servicers: Option<u64>,
    /// Client signature (hex) over the proof with this field blanked.
    pub client_signature: String,
}

impl RelayProof {
    /// SHA-256 of the canonical JSON of the proof with the client signature blanked.
    pub fn signable_hash(&self) -> Result<Hash32, ViperError> {
        let mut unsigned = self.clone();
        unsigned.client_signature = String::new();
        canonical_json_hash(&unsigned).map_err(ViperError::Serialization)
    }

    /// The session header this proof counts against.
    pub fn session_header(&self) -> Result<SessionHeader, ViperError> {
        Ok(SessionHeader {
            requestor_pubkey: self.aat.requestor_key()?,
            chain: self.chain.clone(),
            session_block_height: self.session_block_height,
            geo_zone: self.geo_zone.clone(),
            num_servicers: self.num_servicers,
        })
    }

    /// The address of the servicer the relay is addressed to.
    pub fn servicer_address(&self) -> Address {
        self.servicer_pubkey.address()
    }

    /// Stateless checks.
    pub fn validate_basic(&self) -> Result<(), ViperError> {
        if self.chain.is_empty() {
            return Err(ViperError::EmptyChain);
        }
        if self.session_block_height < 1 {
            return Err(ViperError::InvalidSession("zero session height".into()));
        }
        if self.servicer_pubkey.is_zero() {
            return Err(ViperError::InvalidPubKey("empty servicer key".into()));
        }
        if self.client_signature.is_empty() {
            return Err(ViperError::InvalidSignature("missing client signature".into()));
        }
        Ok(())
    }
}

/// A relay as submitted by a client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Relay {
    /// The RPC call.
    pub payload: Payload,
    /// Signed metadata.
    pub meta: RelayMeta,
    /// The signed proof the servicer keeps as evidence.
    pub proof: RelayProof,
}

#[derive(Serialize)]
struct RequestHashInput<'a> {
    payload: &'a Payload,
    meta: &'a RelayMeta,
}

impl Relay {
    /// `sha256(canonical_json({payload, meta}))`.
    pub fn request_hash(&self) -> Result<Hash32, ViperError> {
        request_hash(&self.payload, &self.meta)
    }
}

/// Hashes a payload and its metadata the way a relay proof commits to them.
pub fn request_hash(payload: &Payload, meta: &RelayMeta) -> Result<Hash32, ViperError> {
    canonical_json_hash(&RequestHashInput { payload, meta }).map_err(ViperError::Serialization)
}

/// The servicer's signed answer to a relay.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelayResponse {
    /// The external chain's response body, verbatim.
    pub response: String,
    /// Servicer signature (hex) over the response with this field blanked.
    pub signature: String,
    /// The proof the response answers.
    pub proof: RelayProof,
}

impl RelayResponse {
    /// SHA-256 of the canonical JSON of the response with the signature blanked.
    pub fn signable_hash(&self) -> Result<Hash32, ViperError> {
        let mut unsigned = self.clone();
        unsigned.signature = String::new();
        canonical_json_hash(&unsigned).map_err(ViperError::Serialization)
    }
}
