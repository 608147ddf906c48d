// Path: crates/types/src/keys/mod.rs
//! Prefixes and builders for every persisted state key.
//!
//! Staking state lives under one namespace per actor kind, the claim/proof
//! keeper under `viper::`. Within a namespace a one-byte tag selects the table.

use crate::app::{Address, EvidenceType, Hash32};

/// Namespace of the requestor staking module.
pub const REQUESTORS_PREFIX: &[u8] = b"requestors::";
/// Namespace of the servicer staking module.
pub const SERVICERS_PREFIX: &[u8] = b"servicers::";
/// Namespace of the claim/proof keeper.
pub const VIPER_PREFIX: &[u8] = b"viper::";

/// Every actor, by address.
pub const ALL_ACTORS_TAG: u8 = 0x01;
/// The staking set, ranked by power.
pub const STAKED_SET_TAG: u8 = 0x02;
/// The unstaking queue, by completion time.
pub const UNSTAKING_QUEUE_TAG: u8 = 0x03;
/// Cumulative burned stake, by address.
pub const BURN_TAG: u8 = 0x04;
/// Pending claims.
pub const CLAIM_TAG: u8 = 0x02;
/// Stored report cards.
pub const REPORT_CARD_TAG: u8 = 0x05;
/// On-chain parameters.
pub const PARAMS_TAG: u8 = 0x06;

/// Tokens per unit of consensus power.
pub const POWER_REDUCTION: u64 = 1_000_000;

/// The two kinds of staked actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorKind {
    /// Pays for relays.
    Requestor,
    /// Serves relays.
    Servicer,
}

impl ActorKind {
    /// The state namespace of this actor kind.
    pub fn prefix(&self) -> &'static [u8] {
        match self {
            ActorKind::Requestor => REQUESTORS_PREFIX,
            ActorKind::Servicer => SERVICERS_PREFIX,
        }
    }

    /// Lowercase name for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::Requestor => "requestor",
            ActorKind::Servicer => "servicer",
        }
    }
}

fn tagged(prefix: &[u8], tag: u8) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 64);
    key.extend_from_slice(prefix);
    key.push(tag);
    key
}

/// Consensus power of a stake.
pub fn consensus_power(stake: u64) -> u64 {
    stake / POWER_REDUCTION
}

/// Prefix of the all-actors table.
pub fn all_actors_prefix(kind: ActorKind) -> Vec<u8> {
    tagged(kind.prefix(), ALL_ACTORS_TAG)
}

/// `ns || 0x01 || addr`.
pub fn actor_key(kind: ActorKind, address: &Address) -> Vec<u8> {
    let mut key = all_actors_prefix(kind);
    key.extend_from_slice(&address.0);
    key
}

/// Prefix of the staking set.
pub fn staked_set_prefix(kind: ActorKind) -> Vec<u8> {
    tagged(kind.prefix(), STAKED_SET_TAG)
}

/// `ns || 0x02 || be64(power) || !addr`. Iterated in reverse, the set runs from
/// highest to lowest power with ties broken by ascending address.
pub fn staked_set_key(kind: ActorKind, stake: u64, address: &Address) -> Vec<u8> {
    let mut key = staked_set_prefix(kind);
    key.extend_from_slice(&consensus_power(stake).to_be_bytes());
    key.extend_from_slice(&address.inverted());
    key
}

/// Prefix of the unstaking queue.
pub fn unstaking_queue_prefix(kind: ActorKind) -> Vec<u8> {
    tagged(kind.prefix(), UNSTAKING_QUEUE_TAG)
}

/// `ns || 0x03 || be64(unix_secs)`; the value lists every address completing then.
pub fn unstaking_queue_key(kind: ActorKind, completion_time: u64) -> Vec<u8> {
    let mut key = unstaking_queue_prefix(kind);
    key.extend_from_slice(&completion_time.to_be_bytes());
    key
}

/// `ns || 0x04 || addr`.
pub fn burn_key(kind: ActorKind, address: &Address) -> Vec<u8> {
    let mut key = tagged(kind.prefix(), BURN_TAG);
    key.extend_from_slice(&address.0);
    key
}

/// Prefix of every claim.
pub fn claims_prefix() -> Vec<u8> {
    tagged(VIPER_PREFIX, CLAIM_TAG)
}

/// Prefix of one servicer's claims.
pub fn claims_prefix_for(servicer: &Address) -> Vec<u8> {
    let mut key = claims_prefix();
    key.extend_from_slice(&servicer.0);
    key
}

/// `viper:: || 0x02 || addr || sha(header) || kind_byte`.
pub fn claim_key(servicer: &Address, header_hash: &Hash32, kind: EvidenceType) -> Vec<u8> {
    let mut key = claims_prefix_for(servicer);
    key.extend_from_slice(header_hash);
    key.push(kind.as_byte());
    key
}

/// Prefix of every report card.
pub fn report_cards_prefix() -> Vec<u8> {
    tagged(VIPER_PREFIX, REPORT_CARD_TAG)
}

/// `viper:: || 0x05 || servicer || fisherman || sha(header)`.
pub fn report_card_key(servicer: &Address, fisherman: &Address, header_hash: &Hash32) -> Vec<u8> {
    let mut key = report_cards_prefix();
    key.extend_from_slice(&servicer.0);
    key.extend_from_slice(&fisherman.0);
    key.extend_from_slice(header_hash);
    key
}

/// `viper:: || 0x06`.
pub fn params_key() -> Vec<u8> {
    tagged(VIPER_PREFIX, PARAMS_TAG)
}
