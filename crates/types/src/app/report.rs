// Path: crates/types/src/app/report.rs
//! Fisherman QoS reports and the report cards stored on-chain.

use super::{Address, EvidenceType, Hash32, HashRange, Score, SessionHeader};
use crate::codec::canonical_json_hash;
use crate::error::ViperError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A fisherman's scores for one servicer over one session.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct QosReport {
    /// `min(1, expected_latency / avg_latency)`.
    pub latency_score: Score,
    /// `1 - missed / total`.
    pub availability_score: Score,
    /// Fraction of responses the reliability oracle accepted.
    pub reliability_score: Score,
    /// Root of the sealed fisherman-test evidence the scores were folded from.
    pub sample_root: HashRange,
    /// Fisherman-chosen nonce.
    pub nonce: u64,
    /// Fisherman signature (hex) over the report with this field blanked.
    pub signature: String,
    /// Unix milliseconds of the first sample.
    pub first_sample_timestamp: u64,
    /// The height at which the report was built.
    pub block_height: u64,
}

impl QosReport {
    /// SHA-256 of the canonical JSON of the report with the signature blanked.
    pub fn signable_hash(&self) -> Result<Hash32, ViperError> {
        let mut unsigned = self.clone();
        unsigned.signature = String::new();
        canonical_json_hash(&unsigned).map_err(ViperError::Serialization)
    }

    /// Whether every score lies in `[0, 1]`.
    pub fn scores_valid(&self) -> bool {
        self.latency_score.is_valid()
            && self.availability_score.is_valid()
            && self.reliability_score.is_valid()
    }
}

/// A stored QoS report.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct ReportCard {
    /// The audited session.
    pub header: SessionHeader,
    /// The rated servicer.
    pub servicer: Address,
    /// The reporting fisherman.
    pub fisherman: Address,
    /// The signed scores.
    pub report: QosReport,
    /// Always `FishermanTest`.
    pub evidence_type: EvidenceType,
    /// The card is dropped at or after this height.
    pub expiration_height: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signable_hash_ignores_signature() {
        let mut report = QosReport {
            latency_score: Score::ONE,
            availability_score: Score::from_ratio(9, 10),
            reliability_score: Score::ONE,
            sample_root: HashRange {
                hash: [1; 32],
                lower: 0,
                upper: 10,
            },
            nonce: 1,
            signature: String::new(),
            first_sample_timestamp: 1_700_000_000_000,
            block_height: 9,
        };
        let unsigned = report.signable_hash().unwrap();
        report.signature = "ff".repeat(64);
        assert_eq!(report.signable_hash().unwrap(), unsigned);
        assert!(report.scores_valid());
    }
}
