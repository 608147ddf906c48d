// Path: crates/api/src/lifecycle/mod.rs
//! Defines traits for modules that hook into the block processing lifecycle.

use crate::ledger::Ledger;
use crate::state::StateAccess;
use crate::transaction::TxContext;
use viper_types::error::TransactionError;

/// A module that performs work after all transactions in a block.
pub trait OnEndBlock: Send + Sync {
    /// Called after all transactions in a block have been processed.
    fn on_end_block(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError>;
}
