// Path: crates/services/src/staking/servicers.rs
//! The servicer staking module and its `StakingView`.

use super::lifecycle::{self, ledger_error};
use super::store::*;
use crate::staking::StakedActor;
use viper_api::ledger::{Ledger, Pool};
use viper_api::lifecycle::OnEndBlock;
use viper_api::staking::StakingView;
use viper_api::state::StateAccess;
use viper_api::transaction::TxContext;
use viper_types::app::{Address, MsgStakeServicer, Servicer, StakeStatus};
use viper_types::config::{StakingParams, ViperParams};
use viper_types::error::{StakingError, StateError, TransactionError};

/// Stakes, edits, unstakes, jails and slashes servicers.
#[derive(Debug, Clone)]
pub struct ServicerKeeper {
    params: StakingParams,
    viper_params: ViperParams,
}

impl ServicerKeeper {
    /// Creates the keeper.
    pub fn new(params: StakingParams, viper_params: ViperParams) -> Self {
        Self {
            params,
            viper_params,
        }
    }

    /// The module's parameters.
    pub fn params(&self) -> &StakingParams {
        &self.params
    }

    fn validate_stake(&self, msg: &MsgStakeServicer) -> Result<(), StakingError> {
        if msg.chains.len() as u64 > self.params.max_chains {
            return Err(StakingError::TooManyChains {
                got: msg.chains.len(),
                max: self.params.max_chains,
            });
        }
        if let Some(chain) = msg.chains.iter().find(|c| !self.viper_params.supports_chain(c)) {
            return Err(StakingError::UnsupportedChain(chain.clone()));
        }
        if let Some(zone) = msg
            .geo_zones
            .iter()
            .find(|z| !self.viper_params.supports_geo_zone(z))
        {
            return Err(StakingError::UnsupportedGeoZone(zone.clone()));
        }
        let url = msg.service_url.trim();
        if url.is_empty() || url.contains(char::is_whitespace) {
            return Err(StakingError::InvalidServiceUrl(msg.service_url.clone()));
        }
        Ok(())
    }

    /// Stakes a new servicer, or edits the stake of a staked one.
    pub fn stake(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        msg: &MsgStakeServicer,
    ) -> Result<Servicer, StakingError> {
        self.validate_stake(msg)?;
        let address = msg.public_key.address();
        let previous = get_actor::<Servicer>(state, &address)?;
        match previous {
            Some(s) if s.status == StakeStatus::Unstaking => Err(StakingError::AlreadyUnstaking),
            Some(mut servicer) if servicer.status == StakeStatus::Staked => {
                if msg.amount < servicer.staked_tokens {
                    return Err(StakingError::StakeDecrease {
                        current: servicer.staked_tokens,
                        new: msg.amount,
                    });
                }
                let delta = msg.amount - servicer.staked_tokens;
                if ledger.balance(&address) < delta {
                    return Err(StakingError::InsufficientFunds);
                }
                let ranked = servicer.in_staking_set();
                if ranked {
                    remove_staked(state, &servicer)?;
                }
                if delta > 0 {
                    ledger
                        .send_to_pool(&address, Pool::ServicerStake, delta)
                        .map_err(ledger_error)?;
                }
                servicer.staked_tokens = msg.amount;
                servicer.chains = msg.chains.clone();
                servicer.geo_zones = msg.geo_zones.clone();
                servicer.service_url = msg.service_url.clone();
                set_actor(state, &servicer)?;
                if ranked {
                    insert_staked(state, &servicer)?;
                }
                tracing::info!(
                    target: "staking",
                    kind = "servicer",
                    %address,
                    added = delta,
                    stake = servicer.staked_tokens,
                    "edited stake"
                );
                Ok(servicer)
            }
            previous => {
                if msg.amount < self.params.minimum_stake {
                    return Err(StakingError::MinimumStake {
                        got: msg.amount,
                        min: self.params.minimum_stake,
                    });
                }
                if staked_count::<Servicer>(state)? >= self.params.max_actors {
                    return Err(StakingError::MaxActorsReached(self.params.max_actors));
                }
                if ledger.balance(&address) < msg.amount {
                    return Err(StakingError::InsufficientFunds);
                }
                ledger
                    .send_to_pool(&address, Pool::ServicerStake, msg.amount)
                    .map_err(ledger_error)?;
                let servicer = Servicer {
                    address,
                    public_key: msg.public_key,
                    jailed: previous.map(|p| p.jailed).unwrap_or(false),
                    status: StakeStatus::Staked,
                    chains: msg.chains.clone(),
                    geo_zones: msg.geo_zones.clone(),
                    service_url: msg.service_url.clone(),
                    staked_tokens: msg.amount,
                    unstaking_completion_time: 0,
                };
                set_actor(state, &servicer)?;
                if servicer.in_staking_set() {
                    insert_staked(state, &servicer)?;
                }
                tracing::info!(
                    target: "staking",
                    kind = "servicer",
                    %address,
                    stake = servicer.staked_tokens,
                    "staked"
                );
                Ok(servicer)
            }
        }
    }

    /// Starts the unstaking period of a servicer.
    pub fn begin_unstake(
        &self,
        state: &mut dyn StateAccess,
        address: &Address,
        block_time: u64,
    ) -> Result<Servicer, StakingError> {
        lifecycle::begin_unstake::<Servicer>(state, &self.params, address, block_time)
    }

    /// Jails a servicer.
    pub fn jail(&self, state: &mut dyn StateAccess, address: &Address) -> Result<Servicer, StakingError> {
        lifecycle::jail::<Servicer>(state, address)
    }

    /// Unjails a servicer.
    pub fn unjail(&self, state: &mut dyn StateAccess, address: &Address) -> Result<Servicer, StakingError> {
        lifecycle::unjail::<Servicer>(state, &self.params, address)
    }

    /// Burns servicer stake, force-unstaking below the minimum.
    pub fn burn(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        address: &Address,
        amount: u64,
    ) -> Result<u64, StakingError> {
        lifecycle::burn::<Servicer>(state, ledger, &self.params, address, amount)
    }

    /// Cumulative stake burned from a servicer.
    pub fn burned(&self, state: &dyn StateAccess, address: &Address) -> Result<u64, StateError> {
        burned::<Servicer>(state, address)
    }
}

impl OnEndBlock for ServicerKeeper {
    fn on_end_block(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        lifecycle::finish_unstaking::<Servicer>(state, ledger, ctx.block_time)?;
        Ok(())
    }
}

/// The servicer staking set over one state snapshot.
pub struct ServicerStateView<'a> {
    state: &'a dyn StateAccess,
    params: &'a ViperParams,
}

impl<'a> ServicerStateView<'a> {
    /// Wraps a state snapshot.
    pub fn new(state: &'a dyn StateAccess, params: &'a ViperParams) -> Self {
        Self { state, params }
    }
}

impl StakingView for ServicerStateView<'_> {
    fn staked_servicers_for_chain(&self, chain: &str) -> Result<Vec<Servicer>, StateError> {
        Ok(staked_actors::<Servicer>(self.state)?
            .into_iter()
            .filter(|s| s.is_eligible_for(chain))
            .collect())
    }

    fn staked_servicers(&self) -> Result<Vec<Servicer>, StateError> {
        staked_actors(self.state)
    }

    fn servicer(&self, address: &Address) -> Result<Option<Servicer>, StateError> {
        get_actor(self.state, address)
    }

    fn blocks_per_session(&self) -> u64 {
        self.params.blocks_per_session
    }

    fn stake_denom(&self) -> String {
        self.params.stake_denom.clone()
    }
}
