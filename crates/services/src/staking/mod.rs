// Path: crates/services/src/staking/mod.rs
//! Requestor and servicer staking.
//!
//! Both actor kinds share one state machine (`Unstaked -> Staked -> Unstaking
//! -> Unstaked`, with `jailed` orthogonal) and one table layout; they differ in
//! what a stake buys. The shared parts are generic over [`StakedActor`].

mod lifecycle;
mod requestors;
mod servicers;
mod store;

pub use lifecycle::*;
pub use requestors::*;
pub use servicers::*;
pub use store::*;

use parity_scale_codec::{Decode, Encode};
use viper_api::ledger::Pool;
use viper_types::app::{Address, Requestor, Servicer, StakeStatus};
use viper_types::keys::ActorKind;

/// The parts of an actor record the shared lifecycle reads and writes.
pub trait StakedActor: Encode + Decode + Clone + Send + Sync {
    /// Which namespace the actor lives in.
    const KIND: ActorKind;
    /// The pool holding its stake.
    const POOL: Pool;

    /// The actor's address.
    fn address(&self) -> Address;
    /// Tokens in the stake pool.
    fn staked_tokens(&self) -> u64;
    /// Sets the staked tokens.
    fn set_staked_tokens(&mut self, tokens: u64);
    /// Lifecycle status.
    fn status(&self) -> StakeStatus;
    /// Sets the lifecycle status.
    fn set_status(&mut self, status: StakeStatus);
    /// Whether the actor is jailed.
    fn is_jailed(&self) -> bool;
    /// Sets the jailed flag.
    fn set_jailed(&mut self, jailed: bool);
    /// Unix seconds at which unstaking completes.
    fn unstaking_completion_time(&self) -> u64;
    /// Sets the unstaking completion time.
    fn set_unstaking_completion_time(&mut self, time: u64);
    /// Called when the actor leaves the staked state for good.
    fn on_unstaked(&mut self) {}

    /// Whether the actor belongs in the staking set.
    fn in_staking_set(&self) -> bool {
        self.status() == StakeStatus::Staked && !self.is_jailed()
    }
}

impl StakedActor for Requestor {
    const KIND: ActorKind = ActorKind::Requestor;
    const POOL: Pool = Pool::RequestorStake;

    fn address(&self) -> Address {
        self.address
    }
    fn staked_tokens(&self) -> u64 {
        self.staked_tokens
    }
    fn set_staked_tokens(&mut self, tokens: u64) {
        self.staked_tokens = tokens;
    }
    fn status(&self) -> StakeStatus {
        self.status
    }
    fn set_status(&mut self, status: StakeStatus) {
        self.status = status;
    }
    fn is_jailed(&self) -> bool {
        self.jailed
    }
    fn set_jailed(&mut self, jailed: bool) {
        self.jailed = jailed;
    }
    fn unstaking_completion_time(&self) -> u64 {
        self.unstaking_completion_time
    }
    fn set_unstaking_completion_time(&mut self, time: u64) {
        self.unstaking_completion_time = time;
    }
    fn on_unstaked(&mut self) {
        self.max_relays = 0;
    }
}

impl StakedActor for Servicer {
    const KIND: ActorKind = ActorKind::Servicer;
    const POOL: Pool = Pool::ServicerStake;

    fn address(&self) -> Address {
        self.address
    }
    fn staked_tokens(&self) -> u64 {
        self.staked_tokens
    }
    fn set_staked_tokens(&mut self, tokens: u64) {
        self.staked_tokens = tokens;
    }
    fn status(&self) -> StakeStatus {
        self.status
    }
    fn set_status(&mut self, status: StakeStatus) {
        self.status = status;
    }
    fn is_jailed(&self) -> bool {
        self.jailed
    }
    fn set_jailed(&mut self, jailed: bool) {
        self.jailed = jailed;
    }
    fn unstaking_completion_time(&self) -> u64 {
        self.unstaking_completion_time
    }
    fn set_unstaking_completion_time(&mut self, time: u64) {
        self.unstaking_completion_time = time;
    }
}
