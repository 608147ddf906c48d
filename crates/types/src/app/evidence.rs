// Path: crates/types/src/app/evidence.rs
//! Evidence kinds, Merkle hash ranges and the proof leaves that evidence
//! accumulates.

use super::{hex_serde, Address, Hash32, RelayProof, RelayResponse};
use crate::error::ViperError;
use crate::hash::sha256;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The kind of evidence an accumulator holds. The discriminant is the
/// `kind_byte` used in state and evidence keys.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EvidenceType {
    /// Relays served by a servicer.
    #[codec(index = 1)]
    Relay,
    /// Conflicting responses proving a servicer answered dishonestly.
    #[codec(index = 2)]
    Challenge,
    /// Fisherman samples of one servicer.
    #[codec(index = 3)]
    FishermanTest,
}

impl EvidenceType {
    /// The single-byte tag used in keys.
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::Relay => 1,
            Self::Challenge => 2,
            Self::FishermanTest => 3,
        }
    }

    /// Parses a key tag.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Relay),
            2 => Some(Self::Challenge),
            3 => Some(Self::FishermanTest),
            _ => None,
        }
    }
}

/// A node of the Merkle accumulator: a hash over the half-open leaf interval
/// `[lower, upper)`.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HashRange {
    /// The node hash.
    #[serde(with = "hex_serde::hash32")]
    pub hash: Hash32,
    /// Inclusive lower bound.
    pub lower: u64,
    /// Exclusive upper bound.
    pub upper: u64,
}

impl HashRange {
    /// The padding sibling of a node whose range ends at `upper`.
    pub fn empty_at(upper: u64) -> Self {
        Self {
            hash: [0u8; 32],
            lower: upper,
            upper,
        }
    }

    /// Whether this is a padding sibling.
    pub fn is_empty(&self) -> bool {
        self.lower == self.upper
    }
}

/// A membership proof for one leaf.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    /// The leaf node.
    pub target: HashRange,
    /// Sibling path, leaf level first.
    pub hash_ranges: Vec<HashRange>,
    /// The leaf index in `[0, total_proofs)`.
    pub target_index: u64,
}

/// One fisherman sample of a servicer.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestResult {
    /// The sampled servicer.
    pub servicer_address: Address,
    /// Unix time of the sample, in milliseconds.
    pub timestamp: u64,
    /// Round-trip latency in milliseconds.
    pub latency_ms: u64,
    /// Whether a correctly signed response came back and the reliability
    /// oracle accepted its body.
    pub is_reliable: bool,
    /// Why no signed response came back. Set only on missed samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Two servicers agree and a third disagrees on the same request.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChallengeProof {
    /// Two matching responses from distinct session servicers.
    pub majority_responses: Vec<RelayResponse>,
    /// The disagreeing response.
    pub minority_response: RelayResponse,
    /// The servicer reporting the conflict.
    pub reporter_address: Address,
}

impl ChallengeProof {
    /// The servicer accused of answering dishonestly.
    pub fn accused_address(&self) -> Address {
        self.minority_response.proof.servicer_address()
    }
}

/// A Merkle leaf.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "value")]
pub enum Proof {
    /// A served relay.
    #[codec(index = 1)]
    Relay(RelayProof),
    /// A conflict report.
    #[codec(index = 2)]
    Challenge(ChallengeProof),
    /// A fisherman sample.
    #[codec(index = 3)]
    Test(TestResult),
}

impl Proof {
    /// The leaf hash: SHA-256 of the leaf's SCALE encoding.
    pub fn hash(&self) -> Hash32 {
        sha256(self.encode())
    }

    /// The key whose repetition within one evidence set is a duplicate.
    pub fn uniqueness_key(&self) -> Vec<u8> {
        match self {
            Proof::Relay(p) => p.entropy.to_be_bytes().to_vec(),
            Proof::Challenge(c) => c.minority_response.proof.request_hash.to_vec(),
            Proof::Test(t) => t.timestamp.to_be_bytes().to_vec(),
        }
    }

    /// The evidence kind this leaf belongs to.
    pub fn evidence_type(&self) -> EvidenceType {
        match self {
            Proof::Relay(_) => EvidenceType::Relay,
            Proof::Challenge(_) => EvidenceType::Challenge,
            Proof::Test(_) => EvidenceType::FishermanTest,
        }
    }

    /// The address expected to sign a `MsgProof` carrying this leaf.
    pub fn submitter(&self) -> Address {
        match self {
            Proof::Relay(p) => p.servicer_address(),
            Proof::Challenge(c) => c.reporter_address,
            Proof::Test(t) => t.servicer_address,
        }
    }

    /// Stateless checks on the leaf.
    pub fn validate_basic(&self) -> Result<(), ViperError> {
        match self {
            Proof::Relay(p) => p.validate_basic(),
            Proof::Challenge(c) => {
                if c.majority_responses.len() != 2 {
                    return Err(ViperError::InvalidProof(format!(
                        "challenge needs 2 majority responses, got {}",
                        c.majority_responses.len()
                    )));
                }
                c.minority_response.proof.validate_basic()?;
                for r in &c.majority_responses {
                    r.proof.validate_basic()?;
                }
                Ok(())
            }
            Proof::Test(t) => {
                if t.timestamp == 0 {
                    return Err(ViperError::InvalidProof("zero sample timestamp".into()));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: u64) -> Proof {
        Proof::Test(TestResult {
            servicer_address: Address([1; 20]),
            timestamp: ts,
            latency_ms: 12,
            is_reliable: true,
            notes: None,
        })
    }

    #[test]
    fn evidence_type_bytes() {
        for t in [
            EvidenceType::Relay,
            EvidenceType::Challenge,
            EvidenceType::FishermanTest,
        ] {
            assert_eq!(EvidenceType::from_byte(t.as_byte()), Some(t));
            assert_eq!(t.encode(), vec![t.as_byte()]);
        }
        assert_eq!(EvidenceType::from_byte(0), None);
    }

    #[test]
    fn leaf_hash_and_uniqueness() {
        assert_ne!(sample(1).hash(), sample(2).hash());
        assert_eq!(sample(5).uniqueness_key(), 5u64.to_be_bytes().to_vec());
        assert_eq!(sample(5).evidence_type(), EvidenceType::FishermanTest);
        assert!(sample(0).validate_basic().is_err());
    }

    #[test]
    fn proof_json_is_tagged() {
        let json = serde_json::to_value(sample(3)).unwrap();
        assert_eq!(json["type"], "Test");
        assert_eq!(json["value"]["timestamp"], 3);
    }
}
