// Path: crates/services/src/claims/genesis.rs
//! Genesis import and export of claims and report cards.

use super::ClaimsKeeper;
use viper_api::state::StateAccess;
use viper_types::app::ViperGenesisState;
use viper_types::error::StateError;

impl ClaimsKeeper {
    /// Every claim and report card, for a genesis file.
    pub fn export_genesis(&self, state: &dyn StateAccess) -> Result<ViperGenesisState, StateError> {
        Ok(ViperGenesisState {
            claims: self.all_claims(state)?,
            report_cards: self.all_report_cards(state)?,
        })
    }

    /// Writes the claims and report cards of a genesis file.
    pub fn init_genesis(&self, state: &mut dyn StateAccess, genesis: &ViperGenesisState) -> Result<(), StateError> {
        for claim in &genesis.claims {
            self.store_claim(state, claim)?;
        }
        for card in &genesis.report_cards {
            self.store_report_card(state, card)?;
        }
        tracing::info!(
            target: "claims",
            claims = genesis.claims.len(),
            report_cards = genesis.report_cards.len(),
            "imported genesis"
        );
        Ok(())
    }
}
