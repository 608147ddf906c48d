// Path: crates/types/src/config/params.rs
//! On-chain parameters. Nodes mirror them locally; keepers read them from state.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Parameters of sessions, claims, proofs and report cards.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, PartialEq, Eq)]
#[serde(default)]
pub struct ViperParams {
    /// Blocks per session.
    pub blocks_per_session: u64,
    /// Servicers per session unless the header or requestor overrides it.
    pub session_servicer_count: u64,
    /// Sessions between session start and the reveal block.
    pub claim_submission_window: u64,
    /// Sessions a claim lives after submission.
    pub claim_expiration: u64,
    /// Minimum proofs per claim.
    pub minimum_proofs: u64,
    /// Burn per claimed proof on replay.
    pub replay_attack_burn_multiplier: u64,
    /// Chains the network pays for.
    pub supported_blockchains: Vec<String>,
    /// Geo zones actors may advertise; empty allows any.
    pub supported_geo_zones: Vec<String>,
    /// Minimum fisherman samples behind a report card.
    pub minimum_sample_relays: u64,
    /// Sessions after the session's opening block during which report cards are accepted.
    pub report_card_submission_window: u64,
    /// Maximum block size the host accepts.
    pub block_byte_size: u64,
    /// Tokens minted per proven relay.
    pub relays_to_tokens_multiplier: u64,
    /// Stake burned from a servicer convicted by challenge evidence.
    pub challenge_burn_amount: u64,
    /// Tokens minted to the challenge reporter.
    pub challenge_reward: u64,
    /// Fishermen drawn per session.
    pub fishermen_per_session: u64,
    /// Denomination of stake and rewards.
    pub stake_denom: String,
}

impl Default for ViperParams {
    fn default() -> Self {
        Self {
            blocks_per_session: 4,
            session_servicer_count: 5,
            claim_submission_window: 3,
            claim_expiration: 24,
            minimum_proofs: 1,
            replay_attack_burn_multiplier: 3,
            supported_blockchains: vec!["0001".to_string()],
            supported_geo_zones: Vec::new(),
            minimum_sample_relays: 10,
            report_card_submission_window: 3,
            block_byte_size: 4_000_000,
            relays_to_tokens_multiplier: 1,
            challenge_burn_amount: 1_000_000,
            challenge_reward: 100_000,
            fishermen_per_session: 1,
            stake_denom: "uvipr".to_string(),
        }
    }
}

impl ViperParams {
    /// Whether the network pays for relays on `chain`.
    pub fn supports_chain(&self, chain: &str) -> bool {
        self.supported_blockchains.iter().any(|c| c == chain)
    }

    /// Whether actors may advertise `zone`.
    pub fn supports_geo_zone(&self, zone: &str) -> bool {
        self.supported_geo_zones.is_empty() || self.supported_geo_zones.iter().any(|z| z == zone)
    }
}

/// Parameters of one staking module.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, PartialEq, Eq)]
#[serde(default)]
pub struct StakingParams {
    /// Minimum stake.
    pub minimum_stake: u64,
    /// Maximum chains per actor.
    pub max_chains: u64,
    /// Maximum actors in the module.
    pub max_actors: u64,
    /// Seconds between begin-unstake and the coins returning.
    pub unstaking_period_secs: u64,
    /// Relays per 100 power (requestors).
    pub base_relays_per_viper: u64,
    /// Flat relay adjustment (requestors); may be negative.
    pub stability_modulation: i64,
    /// Scale quota by network participation (requestors).
    pub participation_rate_on: bool,
    /// Quota of a zero-stake requestor.
    pub max_free_tier_relays_per_session: u64,
    /// Lower bound of a requestor's preferred session size.
    pub min_session_servicers: u64,
    /// Upper bound of a requestor's preferred session size.
    pub max_session_servicers: u64,
}

impl StakingParams {
    /// Defaults for the requestor module.
    pub fn requestor_default() -> Self {
        Self {
            minimum_stake: 1_000_000,
            max_chains: 15,
            max_actors: 100_000,
            unstaking_period_secs: 1_814_400,
            base_relays_per_viper: 100,
            stability_modulation: 0,
            participation_rate_on: false,
            max_free_tier_relays_per_session: 3_000,
            min_session_servicers: 1,
            max_session_servicers: 25,
        }
    }

    /// Defaults for the servicer module.
    pub fn servicer_default() -> Self {
        Self {
            minimum_stake: 15_000_000_000,
            max_chains: 15,
            max_actors: 100_000,
            unstaking_period_secs: 1_814_400,
            ..Self::requestor_default()
        }
    }
}

impl Default for StakingParams {
    fn default() -> Self {
        Self::requestor_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let params: ViperParams = toml::from_str("blocks_per_session = 10").unwrap();
        assert_eq!(params.blocks_per_session, 10);
        assert_eq!(params.claim_submission_window, 3);
        assert!(params.supports_chain("0001"));
        assert!(params.supports_geo_zone("anywhere"));
    }

    #[test]
    fn servicer_defaults_differ_in_minimum() {
        let r = StakingParams::requestor_default();
        let s = StakingParams::servicer_default();
        assert!(s.minimum_stake > r.minimum_stake);
        assert_eq!(s.max_session_servicers, r.max_session_servicers);
    }
}
