// Path: crates/api/src/staking/mod.rs
//! Consumer-side views over the staking modules.
//!
//! The relay core needs the servicer set and single servicers; the requestor
//! module needs to drop cached sessions when a requestor edits its stake.
//! Neither depends on the other's implementation.

use viper_types::app::{Address, Requestor, Servicer};
use viper_types::error::StateError;

/// The servicer staking set as seen by session assembly and the relay core.
pub trait StakingView {
    /// Staked, unjailed servicers advertising `chain`, highest stake first.
    fn staked_servicers_for_chain(&self, chain: &str) -> Result<Vec<Servicer>, StateError>;

    /// Every staked, unjailed servicer, highest stake first.
    fn staked_servicers(&self) -> Result<Vec<Servicer>, StateError>;

    /// A single servicer by address, in any status.
    fn servicer(&self, address: &Address) -> Result<Option<Servicer>, StateError>;

    /// Blocks per session.
    fn blocks_per_session(&self) -> u64;

    /// Denomination of stake.
    fn stake_denom(&self) -> String;
}

/// Requestor lookups.
pub trait RequestorView {
    /// A single requestor by address, in any status.
    fn requestor(&self, address: &Address) -> Result<Option<Requestor>, StateError>;

    /// Every staked, unjailed requestor, highest stake first.
    fn staked_requestors(&self) -> Result<Vec<Requestor>, StateError>;
}

/// Drops every cached session.
pub trait SessionCacheInvalidator: Send + Sync {
    /// Clears the session cache.
    fn clear_sessions(&self);
}

/// An invalidator for hosts that do not cache sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl SessionCacheInvalidator for NoopInvalidator {
    fn clear_sessions(&self) {}
}
