// Path: crates/types/src/app/actors.rs
//! Staked actors. Requestors and servicers share the staking state machine and
//! differ in what their stake buys: relay quota for requestors, session
//! membership for servicers.

use super::{Address, PublicKey};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Where an actor is in the staking lifecycle.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StakeStatus {
    /// Not staked; holds no pool coins.
    #[default]
    #[codec(index = 0)]
    Unstaked,
    /// Waiting in the unstaking queue.
    #[codec(index = 1)]
    Unstaking,
    /// Active.
    #[codec(index = 2)]
    Staked,
}

/// A staked requestor.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct Requestor {
    /// The requestor's address.
    pub address: Address,
    /// The requestor's key; signs AATs.
    pub public_key: PublicKey,
    /// Jailed requestors are out of the staking set.
    pub jailed: bool,
    /// Lifecycle status.
    pub status: StakeStatus,
    /// Chains the requestor pays for.
    pub chains: Vec<String>,
    /// Preferred geo zones.
    pub geo_zones: Vec<String>,
    /// Tokens held in the requestor stake pool.
    pub staked_tokens: u64,
    /// Relays per session across all chains and servicers.
    pub max_relays: u64,
    /// Preferred session size.
    pub num_servicers: Option<u64>,
    /// Unix seconds at which unstaking completes; zero when not unstaking.
    pub unstaking_completion_time: u64,
}

/// A staked servicer.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct Servicer {
    /// The servicer's address.
    pub address: Address,
    /// The servicer's key; signs relay responses.
    pub public_key: PublicKey,
    /// Jailed servicers are out of the staking set.
    pub jailed: bool,
    /// Lifecycle status.
    pub status: StakeStatus,
    /// Chains the servicer relays to.
    pub chains: Vec<String>,
    /// Geo zones the servicer advertises.
    pub geo_zones: Vec<String>,
    /// The servicer's public relay endpoint.
    pub service_url: String,
    /// Tokens held in the servicer stake pool.
    pub staked_tokens: u64,
    /// Unix seconds at which unstaking completes; zero when not unstaking.
    pub unstaking_completion_time: u64,
}

impl Servicer {
    /// Whether the servicer may join a session on `chain` right now.
    pub fn is_eligible_for(&self, chain: &str) -> bool {
        self.status == StakeStatus::Staked && !self.jailed && self.chains.iter().any(|c| c == chain)
    }

    /// Whether the servicer advertises `zone`.
    pub fn serves_zone(&self, zone: &str) -> bool {
        self.geo_zones.iter().any(|z| z == zone)
    }
}

impl Requestor {
    /// Whether the requestor is staked, unjailed and pays for `chain`.
    pub fn authorizes(&self, chain: &str) -> bool {
        self.status == StakeStatus::Staked && !self.jailed && self.chains.iter().any(|c| c == chain)
    }
}
