// Path: crates/types/src/app/session.rs
//! Session headers and assembled sessions.

use super::{Address, Hash32, PublicKey};
use crate::error::ViperError;
use crate::hash::sha256;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The identifier of a session: the requestor, the chain and the height of the
/// block that opened the session.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHeader {
    /// The requestor paying for the session.
    pub requestor_pubkey: PublicKey,
    /// The external chain identifier.
    pub chain: String,
    /// The first block of the session; `(H - 1) % blocks_per_session == 0`.
    pub session_block_height: u64,
    /// Restricts the session to servicers advertising this zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_zone: Option<String>,
    /// Overrides the network's session size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_servicers: Option<u64>,
}

impl SessionHeader {
    /// Builds a header without the optional fields.
    pub fn new(requestor_pubkey: PublicKey, chain: impl Into<String>, height: u64) -> Self {
        Self {
            requestor_pubkey,
            chain: chain.into(),
            session_block_height: height,
            geo_zone: None,
            num_servicers: None,
        }
    }

    /// SHA-256 of the header's SCALE encoding; keys evidence, claims and the session cache.
    pub fn hash(&self) -> Hash32 {
        sha256(self.encode())
    }

    /// Stateless checks on the header.
    pub fn validate_basic(&self) -> Result<(), ViperError> {
        if self.chain.is_empty() {
            return Err(ViperError::EmptyChain);
        }
        if self.requestor_pubkey.is_zero() {
            return Err(ViperError::InvalidPubKey("empty requestor key".into()));
        }
        if self.session_block_height < 1 {
            return Err(ViperError::InvalidSession(
                "session block height must be at least 1".into(),
            ));
        }
        if self.num_servicers == Some(0) {
            return Err(ViperError::InvalidSession("num_servicers is zero".into()));
        }
        Ok(())
    }
}

/// Whether `height` opens a session.
pub fn is_session_block(height: u64, blocks_per_session: u64) -> bool {
    blocks_per_session > 0 && height >= 1 && (height - 1) % blocks_per_session == 0
}

/// The first block of the session containing `height`.
pub fn session_start_height(height: u64, blocks_per_session: u64) -> u64 {
    if blocks_per_session == 0 || height == 0 {
        return 1;
    }
    height - ((height - 1) % blocks_per_session)
}

/// The last block of the session opened at `start`.
pub fn session_end_height(start: u64, blocks_per_session: u64) -> u64 {
    start.saturating_add(blocks_per_session).saturating_sub(1)
}

/// The last block at which a claim or report card for the session opened at
/// `start` is accepted: `window` sessions after the opening block. For claims
/// this is the reveal height.
pub fn submission_deadline(start: u64, window: u64, blocks_per_session: u64) -> u64 {
    start.saturating_add(window.saturating_mul(blocks_per_session))
}

/// A servicer or fisherman as advertised to clients.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct SessionNode {
    /// The node's address.
    pub address: Address,
    /// The node's public relay endpoint.
    pub url: String,
}

/// A session: the header, its pseudorandom key and the selected servicers and fishermen.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The header this session was assembled for.
    pub header: SessionHeader,
    /// `sha256(requestor_pubkey || chain || block_hash)`.
    #[serde(with = "super::hex_serde::hash32")]
    pub key: Hash32,
    /// Ordered servicer addresses.
    pub servicers: Vec<Address>,
    /// Ordered fisherman addresses; may be shorter than requested.
    #[serde(default)]
    pub fishermen: Vec<Address>,
}

impl Session {
    /// Whether `address` serves this session.
    pub fn contains_servicer(&self, address: &Address) -> bool {
        self.servicers.contains(address)
    }

    /// Whether `address` audits this session.
    pub fn contains_fisherman(&self, address: &Address) -> bool {
        self.fishermen.contains(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_heights() {
        assert!(is_session_block(1, 4));
        assert!(is_session_block(5, 4));
        assert!(!is_session_block(4, 4));
        assert!(!is_session_block(0, 4));
        assert_eq!(session_start_height(1, 4), 1);
        assert_eq!(session_start_height(4, 4), 1);
        assert_eq!(session_start_height(5, 4), 5);
        assert_eq!(session_start_height(11, 4), 9);
        assert_eq!(session_end_height(5, 4), 8);
        assert_eq!(submission_deadline(1, 3, 4), 13);
        assert_eq!(submission_deadline(5, 3, 4), 17);
    }

    #[test]
    fn header_hash_depends_on_every_field() {
        let base = SessionHeader::new(PublicKey([1; 32]), "0001", 1);
        let mut zoned = base.clone();
        zoned.geo_zone = Some("eu".into());
        let mut later = base.clone();
        later.session_block_height = 5;
        assert_ne!(base.hash(), zoned.hash());
        assert_ne!(base.hash(), later.hash());
        assert_eq!(base.hash(), base.clone().hash());
    }

    #[test]
    fn header_validate_basic() {
        let mut header = SessionHeader::new(PublicKey([1; 32]), "", 1);
        assert_eq!(header.validate_basic(), Err(ViperError::EmptyChain));
        header.chain = "0001".into();
        assert!(header.validate_basic().is_ok());
        header.session_block_height = 0;
        assert!(matches!(
            header.validate_basic(),
            Err(ViperError::InvalidSession(_))
        ));
    }
}
