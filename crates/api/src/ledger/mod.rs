// Path: crates/api/src/ledger/mod.rs
//! The account/coin ledger. Stake moves between accounts and the two staking
//! pools; rewards are minted and slashes are burned from the pools.

use thiserror::Error;
use viper_types::app::Address;
use viper_types::error::ErrorCode;

/// A module-owned token pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pool {
    /// Holds requestor stake.
    RequestorStake,
    /// Holds servicer stake.
    ServicerStake,
}

/// Ledger failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The source account or pool cannot cover the amount.
    #[error("Insufficient funds: need {need}, have {have}")]
    InsufficientFunds {
        /// The requested amount.
        need: u64,
        /// The available balance.
        have: u64,
    },
    /// A balance would exceed `u64::MAX`.
    #[error("Balance overflow")]
    Overflow,
}

impl ErrorCode for LedgerError {
    fn code(&self) -> &'static str {
        match self {
            Self::InsufficientFunds { .. } => "LEDGER_INSUFFICIENT_FUNDS",
            Self::Overflow => "LEDGER_OVERFLOW",
        }
    }
}

/// Balances and transfers.
pub trait Ledger: Send + Sync {
    /// The spendable balance of an account.
    fn balance(&self, address: &Address) -> u64;

    /// The balance of a pool.
    fn pool_balance(&self, pool: Pool) -> u64;

    /// Total tokens in existence.
    fn total_supply(&self) -> u64;

    /// Moves tokens from an account into a pool.
    fn send_to_pool(&mut self, from: &Address, pool: Pool, amount: u64) -> Result<(), LedgerError>;

    /// Moves tokens from a pool to an account.
    fn send_from_pool(&mut self, pool: Pool, to: &Address, amount: u64) -> Result<(), LedgerError>;

    /// Destroys tokens held by a pool.
    fn burn_from_pool(&mut self, pool: Pool, amount: u64) -> Result<(), LedgerError>;

    /// Creates tokens in an account.
    fn mint(&mut self, to: &Address, amount: u64) -> Result<(), LedgerError>;
}
