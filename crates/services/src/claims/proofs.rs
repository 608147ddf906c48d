// Path: crates/services/src/claims/proofs.rs
//! Proof validation and settlement.

use super::ClaimsKeeper;
use viper_api::ledger::Ledger;
use viper_api::state::StateAccess;
use viper_api::transaction::TxContext;
use viper_crypto::signing::{verify_relay_proof, verify_relay_response};
use viper_state::merkle::{path_covers_root, proof_length, validate_proof};
use viper_state::random::pseudorandom_index;
use viper_types::app::{ChallengeProof, Claim, MsgProof, Proof, SessionHeader};
use viper_types::error::{MerkleError, StakingError, TransactionError, ViperError};

/// What settling a proof did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofOutcome {
    /// Relay evidence: tokens minted to the servicer.
    Rewarded {
        /// Tokens minted.
        minted: u64,
    },
    /// Challenge evidence: the accused servicer was slashed.
    Slashed {
        /// Stake burned from the accused.
        burned: u64,
        /// Tokens minted to the reporter.
        reward: u64,
    },
}

fn leaf_header(leaf: &Proof) -> Result<SessionHeader, ViperError> {
    match leaf {
        Proof::Relay(p) => p.session_header(),
        Proof::Challenge(c) => c.minority_response.proof.session_header(),
        Proof::Test(_) => Err(ViperError::InvalidEvidence(
            "fisherman samples are reported through report cards".into(),
        )),
    }
}

impl ClaimsKeeper {
    /// The claim a proof message opens.
    pub fn claim_for_proof(&self, state: &dyn StateAccess, msg: &MsgProof) -> Result<Claim, ViperError> {
        let kind = msg.evidence_type.ok_or(ViperError::NoEvidenceType)?;
        let header = leaf_header(&msg.leaf)?;
        self.get_claim(state, &msg.leaf.submitter(), &header, kind)?
            .ok_or(ViperError::ClaimNotFound)
    }

    /// Runs every stateful check on a proof and returns the claim it settles.
    pub fn validate_proof(
        &self,
        state: &dyn StateAccess,
        ctx: &TxContext<'_>,
        msg: &MsgProof,
    ) -> Result<Claim, ViperError> {
        let claim = self.claim_for_proof(state, msg)?;
        self.validate_proof_against(state, ctx, &claim, msg)?;
        Ok(claim)
    }

    fn validate_proof_against(
        &self,
        state: &dyn StateAccess,
        ctx: &TxContext<'_>,
        claim: &Claim,
        msg: &MsgProof,
    ) -> Result<(), ViperError> {
        let reveal_height = self.reveal_height(&claim.header);
        if ctx.block_height <= reveal_height {
            return Err(ViperError::PrematureProof);
        }

        let proof = &msg.merkle_proof;
        let expected = proof_length(claim.total_proofs);
        if proof.hash_ranges.len() != expected {
            return Err(ViperError::InvalidProof(format!(
                "path length {} for {} proofs, expected {}",
                proof.hash_ranges.len(),
                claim.total_proofs,
                expected
            )));
        }

        // A repeated hash is a replay whatever else is wrong with the proof.
        let merkle = validate_proof(&claim.merkle_root, proof, claim.total_proofs);
        if merkle == Err(MerkleError::Replay) {
            return Err(ViperError::ReplayAttack);
        }

        // The path authenticates the target hash only; the leaf must be its preimage.
        if proof.target.hash != msg.leaf.hash() {
            return Err(ViperError::InvalidProof("target hash does not match leaf".into()));
        }
        if !path_covers_root(&claim.merkle_root, proof) {
            return Err(ViperError::InvalidProof("path does not cover the claimed root".into()));
        }
        let reveal_hash = ctx
            .chain
            .block_hash(reveal_height)
            .ok_or(ViperError::EmptyBlockId(reveal_height))?;
        let index = pseudorandom_index(claim.total_proofs, &claim.header, &reveal_hash);
        if index != proof.target_index {
            return Err(ViperError::InvalidProof(format!(
                "target index {} is not the selected leaf {}",
                proof.target_index, index
            )));
        }
        merkle?;

        match &msg.leaf {
            Proof::Relay(relay) => {
                verify_relay_proof(relay)?;
                if relay.servicer_address() != claim.servicer_address {
                    return Err(ViperError::InvalidProof("relay was served by another servicer".into()));
                }
                Ok(())
            }
            Proof::Challenge(challenge) => self.validate_challenge(state, ctx, claim, challenge),
            Proof::Test(_) => Err(ViperError::InvalidEvidence(
                "fisherman samples are reported through report cards".into(),
            )),
        }
    }

    fn validate_challenge(
        &self,
        state: &dyn StateAccess,
        ctx: &TxContext<'_>,
        claim: &Claim,
        challenge: &ChallengeProof,
    ) -> Result<(), ViperError> {
        if challenge.reporter_address != claim.servicer_address {
            return Err(ViperError::InvalidProof("challenge reported by another servicer".into()));
        }
        let minority = &challenge.minority_response;
        let [first, second] = challenge.majority_responses.as_slice() else {
            return Err(ViperError::InvalidProof("challenge needs two majority responses".into()));
        };
        for response in [first, second, minority] {
            verify_relay_response(response)?;
            verify_relay_proof(&response.proof)?;
            if response.proof.request_hash != minority.proof.request_hash {
                return Err(ViperError::InvalidProof("responses answer different requests".into()));
            }
            if response.proof.session_header()? != claim.header {
                return Err(ViperError::InvalidProof("response from another session".into()));
            }
        }
        if first.response != second.response {
            return Err(ViperError::InvalidProof("majority responses disagree".into()));
        }
        if minority.response == first.response {
            return Err(ViperError::InvalidProof("minority response agrees with the majority".into()));
        }

        let accused = challenge.accused_address();
        let (a, b) = (first.proof.servicer_address(), second.proof.servicer_address());
        if a == b || a == accused || b == accused {
            return Err(ViperError::InvalidProof("challenge responses must come from three servicers".into()));
        }
        let session = self.sessions.session(ctx.chain, state, &self.params, &claim.header)?;
        if ![a, b, accused].iter().all(|s| session.contains_servicer(s)) {
            return Err(ViperError::NotSessionServicer);
        }
        Ok(())
    }

    /// Settles a validated proof and deletes its claim.
    pub fn execute_proof(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        claim: &Claim,
        leaf: &Proof,
    ) -> Result<ProofOutcome, TransactionError> {
        self.delete_claim(state, claim)?;
        let outcome = match leaf {
            Proof::Challenge(challenge) => {
                let accused = challenge.accused_address();
                let burned = self
                    .servicers
                    .burn(state, ledger, &accused, self.params.challenge_burn_amount)?;
                let reward = self.params.challenge_reward;
                ledger
                    .mint(&claim.servicer_address, reward)
                    .map_err(|e| StakingError::Ledger(e.to_string()))?;
                tracing::warn!(
                    target: "claims",
                    accused = %accused,
                    reporter = %claim.servicer_address,
                    burned,
                    reward,
                    "challenge upheld"
                );
                ProofOutcome::Slashed { burned, reward }
            }
            _ => {
                let minted = claim
                    .total_proofs
                    .saturating_mul(self.params.relays_to_tokens_multiplier);
                ledger
                    .mint(&claim.servicer_address, minted)
                    .map_err(|e| StakingError::Ledger(e.to_string()))?;
                tracing::info!(
                    target: "claims",
                    servicer = %claim.servicer_address,
                    session = claim.header.session_block_height,
                    relays = claim.total_proofs,
                    minted,
                    "proof accepted"
                );
                ProofOutcome::Rewarded { minted }
            }
        };
        Ok(outcome)
    }

    /// Deletes a double-counting claim and burns
    /// `total_proofs × replay_attack_burn_multiplier` of the servicer's stake.
    /// Returns the amount burned.
    pub fn handle_replay_attack(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        claim: &Claim,
    ) -> Result<u64, TransactionError> {
        self.delete_claim(state, claim)?;
        let amount = claim
            .total_proofs
            .saturating_mul(self.params.replay_attack_burn_multiplier);
        let burned = self
            .servicers
            .burn(state, ledger, &claim.servicer_address, amount)?;
        tracing::warn!(
            target: "claims",
            servicer = %claim.servicer_address,
            session = claim.header.session_block_height,
            total_proofs = claim.total_proofs,
            burned,
            "replay attack: claim deleted and stake burned"
        );
        Ok(burned)
    }

    /// Validates and settles a proof. A replayed proof burns the claimant
    /// and still fails with `ReplayAttack`.
    pub fn handle_proof(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        ctx: &TxContext<'_>,
        msg: &MsgProof,
    ) -> Result<ProofOutcome, TransactionError> {
        let claim = self.claim_for_proof(state, msg)?;
        match self.validate_proof_against(state, ctx, &claim, msg) {
            Ok(()) => self.execute_proof(state, ledger, &claim, &msg.leaf),
            Err(ViperError::ReplayAttack) => {
                self.handle_replay_attack(state, ledger, &claim)?;
                Err(ViperError::ReplayAttack.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
