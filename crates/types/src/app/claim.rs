// Path: crates/types/src/app/claim.rs
//! On-chain claims: a servicer's commitment to the Merkle root of its sealed
//! evidence for one session.

use super::{submission_deadline, Address, EvidenceType, HashRange, SessionHeader};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A stored claim.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    /// The session the evidence belongs to.
    pub header: SessionHeader,
    /// Root over `[0, total_proofs)`.
    pub merkle_root: HashRange,
    /// The number of leaves in the sealed evidence.
    pub total_proofs: u64,
    /// The claiming servicer (or reporter, for challenges).
    pub servicer_address: Address,
    /// The evidence kind claimed.
    pub evidence_type: EvidenceType,
    /// The claim is dropped at or after this height.
    pub expiration_height: u64,
}

impl Claim {
    /// The height whose block hash seeds the challenged leaf index.
    pub fn reveal_height(&self, claim_submission_window: u64, blocks_per_session: u64) -> u64 {
        submission_deadline(
            self.header.session_block_height,
            claim_submission_window,
            blocks_per_session,
        )
    }

    /// Whether a proof may be submitted at `current_height`.
    pub fn is_mature(
        &self,
        current_height: u64,
        claim_submission_window: u64,
        blocks_per_session: u64,
    ) -> bool {
        current_height > self.reveal_height(claim_submission_window, blocks_per_session)
    }
}

/// Claims and report cards carried across a genesis export/import.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq, Default)]
pub struct ViperGenesisState {
    /// Pending claims.
    pub claims: Vec<Claim>,
    /// Stored report cards.
    pub report_cards: Vec<super::ReportCard>,
}
