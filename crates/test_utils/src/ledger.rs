// Path: crates/test_utils/src/ledger.rs
//! An in-memory account/coin ledger.

use std::collections::BTreeMap;
use viper_api::ledger::{Ledger, LedgerError, Pool};
use viper_types::app::Address;

/// Balances and pools held in ordered maps. Total supply tracks mints and burns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryLedger {
    accounts: BTreeMap<Address, u64>,
    pools: BTreeMap<Pool, u64>,
    supply: u64,
}

impl MemoryLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` to `address`, as genesis would.
    pub fn fund(&mut self, address: &Address, amount: u64) {
        let balance = self.accounts.entry(*address).or_insert(0);
        *balance = balance.saturating_add(amount);
        self.supply = self.supply.saturating_add(amount);
    }

    fn debit(balance: &mut u64, amount: u64) -> Result<(), LedgerError> {
        if *balance < amount {
            return Err(LedgerError::InsufficientFunds {
                need: amount,
                have: *balance,
            });
        }
        *balance -= amount;
        Ok(())
    }

    fn credit(balance: &mut u64, amount: u64) -> Result<(), LedgerError> {
        *balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }
}

impl Ledger for MemoryLedger {
    fn balance(&self, address: &Address) -> u64 {
        self.accounts.get(address).copied().unwrap_or(0)
    }

    fn pool_balance(&self, pool: Pool) -> u64 {
        self.pools.get(&pool).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> u64 {
        self.supply
    }

    fn send_to_pool(&mut self, from: &Address, pool: Pool, amount: u64) -> Result<(), LedgerError> {
        Self::debit(self.accounts.entry(*from).or_insert(0), amount)?;
        Self::credit(self.pools.entry(pool).or_insert(0), amount)
    }

    fn send_from_pool(&mut self, pool: Pool, to: &Address, amount: u64) -> Result<(), LedgerError> {
        Self::debit(self.pools.entry(pool).or_insert(0), amount)?;
        Self::credit(self.accounts.entry(*to).or_insert(0), amount)
    }

    fn burn_from_pool(&mut self, pool: Pool, amount: u64) -> Result<(), LedgerError> {
        Self::debit(self.pools.entry(pool).or_insert(0), amount)?;
        self.supply = self.supply.saturating_sub(amount);
        Ok(())
    }

    fn mint(&mut self, to: &Address, amount: u64) -> Result<(), LedgerError> {
        Self::credit(self.accounts.entry(*to).or_insert(0), amount)?;
        self.supply = self.supply.saturating_add(amount);
        Ok(())
    }
}
