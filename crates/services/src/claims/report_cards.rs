// Path: crates/services/src/claims/report_cards.rs
//! Fisherman report cards.
//!
//! A card is accepted after the audited session ends and until
//! `report_card_submission_window` sessions after the session's opening
//! block, the same anchor the claim window uses.

use super::ClaimsKeeper;
use crate::staking::get_actor;
use viper_api::state::{get_decoded, put_encoded, scan_decoded, StateAccess};
use viper_api::transaction::TxContext;
use viper_crypto::signing::verify_report;
use viper_types::app::{
    session_end_height, submission_deadline, Address, EvidenceType, MsgSubmitReportCard, ReportCard, Servicer,
    SessionHeader,
};
use viper_types::error::{StateError, ViperError};
use viper_types::keys::{report_card_key, report_cards_prefix};

impl ClaimsKeeper {
    /// Runs every stateful check on a report card and returns the card that
    /// would be stored.
    pub fn validate_report_card(
        &self,
        state: &dyn StateAccess,
        ctx: &TxContext<'_>,
        msg: &MsgSubmitReportCard,
    ) -> Result<ReportCard, ViperError> {
        if msg.evidence_type != Some(EvidenceType::FishermanTest) {
            return Err(ViperError::InvalidReportCard(
                "evidence type must be FishermanTest".into(),
            ));
        }
        let bps = self.params.blocks_per_session;
        let end = session_end_height(msg.header.session_block_height, bps);
        if ctx.block_height <= end {
            return Err(ViperError::SessionNotOver);
        }
        let deadline = submission_deadline(
            msg.header.session_block_height,
            self.params.report_card_submission_window,
            bps,
        );
        if ctx.block_height > deadline {
            return Err(ViperError::ExpiredProofs);
        }
        let samples = msg.report.sample_root.upper;
        if samples < self.params.minimum_sample_relays {
            return Err(ViperError::InvalidReportCard(format!(
                "{} samples, minimum is {}",
                samples, self.params.minimum_sample_relays
            )));
        }
        if self
            .get_report_card(state, &msg.servicer, &msg.fisherman, &msg.header)?
            .is_some()
        {
            return Err(ViperError::InvalidReportCard("report card already submitted".into()));
        }

        let fisherman = get_actor::<Servicer>(state, &msg.fisherman)?
            .ok_or_else(|| ViperError::ServicerNotFound(msg.fisherman.to_hex()))?;
        verify_report(&fisherman.public_key, &msg.report)?;

        let session = self.sessions.session(ctx.chain, state, &self.params, &msg.header)?;
        if !session.contains_fisherman(&msg.fisherman) {
            return Err(ViperError::NotSessionFisherman);
        }
        if !session.contains_servicer(&msg.servicer) {
            return Err(ViperError::NotSessionServicer);
        }

        Ok(ReportCard {
            header: msg.header.clone(),
            servicer: msg.servicer,
            fisherman: msg.fisherman,
            report: msg.report.clone(),
            evidence_type: EvidenceType::FishermanTest,
            expiration_height: self.expiration_height(ctx.block_height),
        })
    }

    /// Validates and stores a report card.
    pub fn set_report_card(
        &self,
        state: &mut dyn StateAccess,
        ctx: &TxContext<'_>,
        msg: &MsgSubmitReportCard,
    ) -> Result<ReportCard, ViperError> {
        let card = self.validate_report_card(state, ctx, msg)?;
        self.store_report_card(state, &card)?;
        tracing::info!(
            target: "claims",
            servicer = %card.servicer,
            fisherman = %card.fisherman,
            session = card.header.session_block_height,
            latency = %card.report.latency_score,
            availability = %card.report.availability_score,
            reliability = %card.report.reliability_score,
            "report card accepted"
        );
        Ok(card)
    }

    pub(crate) fn store_report_card(&self, state: &mut dyn StateAccess, card: &ReportCard) -> Result<(), StateError> {
        put_encoded(
            state,
            &report_card_key(&card.servicer, &card.fisherman, &card.header.hash()),
            card,
        )
    }

    /// The card `fisherman` filed on `servicer` for `header`.
    pub fn get_report_card(
        &self,
        state: &dyn StateAccess,
        servicer: &Address,
        fisherman: &Address,
        header: &SessionHeader,
    ) -> Result<Option<ReportCard>, StateError> {
        get_decoded(state, &report_card_key(servicer, fisherman, &header.hash()))
    }

    /// Every stored report card.
    pub fn all_report_cards(&self, state: &dyn StateAccess) -> Result<Vec<ReportCard>, StateError> {
        Ok(scan_decoded::<ReportCard>(state, &report_cards_prefix())?
            .into_iter()
            .map(|(_, card)| card)
            .collect())
    }

    /// Drops report cards whose expiration height has been reached.
    pub fn delete_expired_report_cards(
        &self,
        state: &mut dyn StateAccess,
        height: u64,
    ) -> Result<usize, StateError> {
        let expired: Vec<Vec<u8>> = scan_decoded::<ReportCard>(state, &report_cards_prefix())?
            .into_iter()
            .filter(|(_, card)| card.expiration_height <= height)
            .map(|(key, _)| key)
            .collect();
        for key in &expired {
            state.delete(key)?;
        }
        if !expired.is_empty() {
            tracing::debug!(target: "claims", count = expired.len(), height, "deleted expired report cards");
        }
        Ok(expired.len())
    }
}
