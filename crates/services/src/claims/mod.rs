// Path: crates/services/src/claims/mod.rs
//! The claim/proof keeper.
//!
//! Claims commit a servicer to the Merkle root of its sealed evidence before
//! the reveal block exists; proofs open one leaf chosen by the reveal block's
//! hash. A claim is accepted strictly after its session ends and no later than
//! the reveal height, and a proof strictly after the reveal height.

mod genesis;
mod proofs;
mod report_cards;

pub use proofs::*;
pub use report_cards::*;

use crate::session::{check_billable_header, effective_session_size, SessionCache};
use crate::staking::{get_actor, ServicerKeeper, StakedActor};
use std::sync::Arc;
use viper_api::ledger::Ledger;
use viper_api::lifecycle::OnEndBlock;
use viper_api::state::{get_decoded, put_encoded, scan_decoded, StateAccess};
use viper_api::transaction::TxContext;
use viper_types::app::{
    session_end_height, submission_deadline, Address, Claim, EvidenceType, MsgClaim, Requestor, Servicer,
    SessionHeader,
};
use viper_types::config::ViperParams;
use viper_types::error::{StateError, TransactionError, ViperError};
use viper_types::keys::{claim_key, claims_prefix, claims_prefix_for};

/// Relays one servicer may serve in one session for `requestor`.
pub fn max_possible_relays(requestor: &Requestor, session_size: u64) -> u64 {
    let chains = requestor.chains.len() as u64;
    if chains == 0 || session_size == 0 {
        return 0;
    }
    requestor.max_relays / chains / session_size
}

/// Validates and stores claims, proofs and report cards.
#[derive(Clone)]
pub struct ClaimsKeeper {
    params: ViperParams,
    sessions: Arc<SessionCache>,
    servicers: ServicerKeeper,
}

impl ClaimsKeeper {
    /// Creates the keeper. `servicers` is used to burn stake on replay and
    /// challenge convictions.
    pub fn new(params: ViperParams, sessions: Arc<SessionCache>, servicers: ServicerKeeper) -> Self {
        Self {
            params,
            sessions,
            servicers,
        }
    }

    /// The keeper's parameters.
    pub fn params(&self) -> &ViperParams {
        &self.params
    }

    fn reveal_height(&self, header: &SessionHeader) -> u64 {
        submission_deadline(
            header.session_block_height,
            self.params.claim_submission_window,
            self.params.blocks_per_session,
        )
    }

    fn expiration_height(&self, height: u64) -> u64 {
        height.saturating_add(
            self.params
                .claim_expiration
                .saturating_mul(self.params.blocks_per_session),
        )
    }

    /// Runs every stateful check on a claim and returns the claim that would
    /// be stored.
    pub fn validate_claim(
        &self,
        state: &dyn StateAccess,
        ctx: &TxContext<'_>,
        msg: &MsgClaim,
    ) -> Result<Claim, ViperError> {
        let kind = msg.evidence_type.ok_or(ViperError::NoEvidenceType)?;
        let header = &msg.header;
        let start = header.session_block_height;
        if ctx.block_height <= session_end_height(start, self.params.blocks_per_session) {
            return Err(ViperError::SessionNotOver);
        }
        if self.get_claim(state, &msg.from_address, header, kind)?.is_some() {
            return Err(ViperError::ClaimAlreadyExists);
        }
        if msg.total_proofs < self.params.minimum_proofs {
            return Err(ViperError::InsufficientProofs {
                got: msg.total_proofs,
                min: self.params.minimum_proofs,
            });
        }
        if !self.params.supports_chain(&header.chain) {
            return Err(ViperError::UnsupportedBlockchain(header.chain.clone()));
        }

        let at_start = ctx.chain.state_at(start).ok_or(ViperError::EmptyBlockId(start))?;
        let servicer = get_actor::<Servicer>(at_start.as_ref(), &msg.from_address)?;
        if !servicer.map(|s| s.in_staking_set()).unwrap_or(false) {
            return Err(ViperError::ServicerNotFound(msg.from_address.to_hex()));
        }
        let requestor_address = header.requestor_pubkey.address();
        let requestor = get_actor::<Requestor>(at_start.as_ref(), &requestor_address)?
            .ok_or_else(|| ViperError::RequestorNotFound(requestor_address.to_hex()))?;
        check_billable_header(header, &requestor)?;

        let session_size = effective_session_size(header, Some(&requestor), &self.params);
        let max = max_possible_relays(&requestor, session_size);
        if msg.total_proofs > max {
            return Err(ViperError::OverService {
                count: msg.total_proofs,
                max,
            });
        }

        let session = self.sessions.session(ctx.chain, state, &self.params, header)?;
        if !session.contains_servicer(&msg.from_address) {
            return Err(ViperError::NotSessionServicer);
        }

        let claim = Claim {
            header: header.clone(),
            merkle_root: msg.merkle_root,
            total_proofs: msg.total_proofs,
            servicer_address: msg.from_address,
            evidence_type: kind,
            expiration_height: self.expiration_height(ctx.block_height),
        };
        if claim.is_mature(
            ctx.block_height,
            self.params.claim_submission_window,
            self.params.blocks_per_session,
        ) {
            return Err(ViperError::ExpiredProofs);
        }
        Ok(claim)
    }

    /// Validates and stores a claim.
    pub fn set_claim(
        &self,
        state: &mut dyn StateAccess,
        ctx: &TxContext<'_>,
        msg: &MsgClaim,
    ) -> Result<Claim, ViperError> {
        let claim = self.validate_claim(state, ctx, msg)?;
        self.store_claim(state, &claim)?;
        tracing::info!(
            target: "claims",
            servicer = %claim.servicer_address,
            chain = %claim.header.chain,
            session = claim.header.session_block_height,
            kind = ?claim.evidence_type,
            total_proofs = claim.total_proofs,
            expiration = claim.expiration_height,
            "claim accepted"
        );
        Ok(claim)
    }

    pub(crate) fn store_claim(&self, state: &mut dyn StateAccess, claim: &Claim) -> Result<(), StateError> {
        put_encoded(
            state,
            &claim_key(&claim.servicer_address, &claim.header.hash(), claim.evidence_type),
            claim,
        )
    }

    pub(crate) fn delete_claim(&self, state: &mut dyn StateAccess, claim: &Claim) -> Result<(), StateError> {
        state.delete(&claim_key(
            &claim.servicer_address,
            &claim.header.hash(),
            claim.evidence_type,
        ))
    }

    /// The claim of `servicer` for `header` and `kind`.
    pub fn get_claim(
        &self,
        state: &dyn StateAccess,
        servicer: &Address,
        header: &SessionHeader,
        kind: EvidenceType,
    ) -> Result<Option<Claim>, StateError> {
        get_decoded(state, &claim_key(servicer, &header.hash(), kind))
    }

    /// Every claim of `servicer`.
    pub fn claims_of(&self, state: &dyn StateAccess, servicer: &Address) -> Result<Vec<Claim>, StateError> {
        Ok(scan_decoded::<Claim>(state, &claims_prefix_for(servicer))?
            .into_iter()
            .map(|(_, claim)| claim)
            .collect())
    }

    /// Every stored claim.
    pub fn all_claims(&self, state: &dyn StateAccess) -> Result<Vec<Claim>, StateError> {
        Ok(scan_decoded::<Claim>(state, &claims_prefix())?
            .into_iter()
            .map(|(_, claim)| claim)
            .collect())
    }

    /// Claims of `servicer` whose reveal block exists at `height`.
    pub fn get_mature_claims(
        &self,
        state: &dyn StateAccess,
        servicer: &Address,
        height: u64,
    ) -> Result<Vec<Claim>, StateError> {
        Ok(self
            .claims_of(state, servicer)?
            .into_iter()
            .filter(|c| height > self.reveal_height(&c.header))
            .collect())
    }

    /// Drops claims whose expiration height has been reached. Returns the
    /// number dropped.
    pub fn delete_expired_claims(&self, state: &mut dyn StateAccess, height: u64) -> Result<usize, StateError> {
        let expired: Vec<Vec<u8>> = scan_decoded::<Claim>(state, &claims_prefix())?
            .into_iter()
            .filter(|(_, claim)| claim.expiration_height <= height)
            .map(|(key, _)| key)
            .collect();
        for key in &expired {
            state.delete(key)?;
        }
        if !expired.is_empty() {
            tracing::info!(target: "claims", count = expired.len(), height, "deleted expired claims");
        }
        Ok(expired.len())
    }
}

impl OnEndBlock for ClaimsKeeper {
    fn on_end_block(
        &self,
        state: &mut dyn StateAccess,
        _ledger: &mut dyn Ledger,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        self.delete_expired_claims(state, ctx.block_height)?;
        self.delete_expired_report_cards(state, ctx.block_height)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
