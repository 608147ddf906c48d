// Path: crates/services/src/staking/requestors.rs
//! The requestor staking module.

use super::lifecycle::{self, ledger_error};
use super::store::*;
use crate::staking::StakedActor;
use std::sync::Arc;
use viper_api::ledger::{Ledger, Pool};
use viper_api::lifecycle::OnEndBlock;
use viper_api::staking::{RequestorView, SessionCacheInvalidator};
use viper_api::state::StateAccess;
use viper_api::transaction::TxContext;
use viper_types::app::{Address, MsgStakeRequestor, Requestor, StakeStatus};
use viper_types::config::{StakingParams, ViperParams};
use viper_types::error::{StakingError, StateError, TransactionError};

/// `base_relays_per_viper` is per 100 tokens of power and power is per 10^6
/// tokens of stake.
const RELAY_RATE_DENOMINATOR: u128 = 100 * 1_000_000;

/// Stakes, edits, unstakes and jails requestors.
#[derive(Clone)]
pub struct RequestorKeeper {
    params: StakingParams,
    viper_params: ViperParams,
    sessions: Arc<dyn SessionCacheInvalidator>,
}

impl RequestorKeeper {
    /// Creates a keeper that clears `sessions` whenever a requestor edits its stake.
    pub fn new(
        params: StakingParams,
        viper_params: ViperParams,
        sessions: Arc<dyn SessionCacheInvalidator>,
    ) -> Self {
        Self {
            params,
            viper_params,
            sessions,
        }
    }

    /// The module's parameters.
    pub fn params(&self) -> &StakingParams {
        &self.params
    }

    /// Relays per session a requestor with `stake` may consume, across all of
    /// its chains and servicers.
    pub fn max_relays(&self, ledger: &dyn Ledger, stake: u64) -> u64 {
        if stake == 0 {
            return self.params.max_free_tier_relays_per_session;
        }
        let mut scaled = stake as u128 * self.params.base_relays_per_viper as u128;
        if self.params.participation_rate_on {
            let total = ledger.total_supply() as u128;
            if total > 0 {
                let staked = ledger.pool_balance(Pool::RequestorStake) as u128
                    + ledger.pool_balance(Pool::ServicerStake) as u128;
                scaled = mul_div(scaled, staked, total);
            }
        }
        let relays = (scaled / RELAY_RATE_DENOMINATOR).min(i128::MAX as u128) as i128
            + self.params.stability_modulation as i128;
        relays.clamp(0, u64::MAX as i128) as u64
    }

    fn validate_stake(&self, msg: &MsgStakeRequestor) -> Result<(), StakingError> {
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
        if let Some(n) = msg.num_servicers {
            let (min, max) = (self.params.min_session_servicers, self.params.max_session_servicers);
            if n < min || n > max {
                return Err(StakingError::InvalidNumServicers { got: n, min, max });
            }
        }
        Ok(())
    }

    /// Stakes a new requestor, or edits the stake of a staked one.
    pub fn stake(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        msg: &MsgStakeRequestor,
    ) -> Result<Requestor, StakingError> {
        self.validate_stake(msg)?;
        let address = msg.public_key.address();
        match get_actor::<Requestor>(state, &address)? {
            Some(existing) if existing.status == StakeStatus::Staked => {
                self.edit_stake(state, ledger, existing, msg)
            }
            Some(existing) if existing.status == StakeStatus::Unstaking => {
                Err(StakingError::AlreadyUnstaking)
            }
            previous => self.new_stake(state, ledger, previous, msg),
        }
    }

    fn new_stake(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        previous: Option<Requestor>,
        msg: &MsgStakeRequestor,
    ) -> Result<Requestor, StakingError> {
        let address = msg.public_key.address();
        if msg.amount < self.params.minimum_stake {
            return Err(StakingError::MinimumStake {
                got: msg.amount,
                min: self.params.minimum_stake,
            });
        }
        if staked_count::<Requestor>(state)? >= self.params.max_actors {
            return Err(StakingError::MaxActorsReached(self.params.max_actors));
        }
        if ledger.balance(&address) < msg.amount {
            return Err(StakingError::InsufficientFunds);
        }
        ledger
            .send_to_pool(&address, Pool::RequestorStake, msg.amount)
            .map_err(ledger_error)?;

        let requestor = Requestor {
            address,
            public_key: msg.public_key,
            jailed: previous.map(|p| p.jailed).unwrap_or(false),
            status: StakeStatus::Staked,
            chains: msg.chains.clone(),
            geo_zones: msg.geo_zones.clone(),
            staked_tokens: msg.amount,
            max_relays: self.max_relays(ledger, msg.amount),
            num_servicers: msg.num_servicers,
            unstaking_completion_time: 0,
        };
        set_actor(state, &requestor)?;
        if requestor.in_staking_set() {
            insert_staked(state, &requestor)?;
        }
        tracing::info!(
            target: "staking",
            kind = "requestor",
            %address,
            stake = requestor.staked_tokens,
            max_relays = requestor.max_relays,
            "staked"
        );
        Ok(requestor)
    }

    fn edit_stake(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        mut requestor: Requestor,
        msg: &MsgStakeRequestor,
    ) -> Result<Requestor, StakingError> {
        if msg.amount < requestor.staked_tokens {
            return Err(StakingError::StakeDecrease {
                current: requestor.staked_tokens,
                new: msg.amount,
            });
        }
        let delta = msg.amount - requestor.staked_tokens;
        if ledger.balance(&requestor.address) < delta {
            return Err(StakingError::InsufficientFunds);
        }

        let ranked = requestor.in_staking_set();
        if ranked {
            remove_staked(state, &requestor)?;
        }
        if delta > 0 {
            ledger
                .send_to_pool(&requestor.address, Pool::RequestorStake, delta)
                .map_err(ledger_error)?;
        }
        requestor.staked_tokens = msg.amount;
        requestor.chains = msg.chains.clone();
        requestor.geo_zones = msg.geo_zones.clone();
        requestor.num_servicers = msg.num_servicers;
        requestor.max_relays = self.max_relays(ledger, requestor.staked_tokens);
        set_actor(state, &requestor)?;
        if ranked {
            insert_staked(state, &requestor)?;
        }
        self.sessions.clear_sessions();

        tracing::info!(
            target: "staking",
            kind = "requestor",
            address = %requestor.address,
            added = delta,
            stake = requestor.staked_tokens,
            max_relays = requestor.max_relays,
            "edited stake"
        );
        Ok(requestor)
    }

    /// Starts the unstaking period of a requestor.
    pub fn begin_unstake(
        &self,
        state: &mut dyn StateAccess,
        address: &Address,
        block_time: u64,
    ) -> Result<Requestor, StakingError> {
        lifecycle::begin_unstake::<Requestor>(state, &self.params, address, block_time)
    }

    /// Jails a requestor.
    pub fn jail(&self, state: &mut dyn StateAccess, address: &Address) -> Result<Requestor, StakingError> {
        lifecycle::jail::<Requestor>(state, address)
    }

    /// Unjails a requestor.
    pub fn unjail(&self, state: &mut dyn StateAccess, address: &Address) -> Result<Requestor, StakingError> {
        lifecycle::unjail::<Requestor>(state, &self.params, address)
    }

    /// Burns requestor stake and recomputes its quota.
    pub fn burn(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        address: &Address,
        amount: u64,
    ) -> Result<u64, StakingError> {
        let burned = lifecycle::burn::<Requestor>(state, ledger, &self.params, address, amount)?;
        if let Some(mut requestor) = get_actor::<Requestor>(state, address)? {
            if requestor.status != StakeStatus::Unstaked {
                requestor.max_relays = self.max_relays(ledger, requestor.staked_tokens);
                set_actor(state, &requestor)?;
            }
        }
        Ok(burned)
    }

    /// A requestor by address.
    pub fn requestor(&self, state: &dyn StateAccess, address: &Address) -> Result<Option<Requestor>, StateError> {
        get_actor(state, address)
    }
}

impl OnEndBlock for RequestorKeeper {
    fn on_end_block(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        lifecycle::finish_unstaking::<Requestor>(state, ledger, ctx.block_time)?;
        Ok(())
    }
}

/// `a * b / c` without overflowing for any `a` and `b` up to `u128`, saturating
/// when the quotient itself does not fit.
pub(crate) fn mul_div(a: u128, b: u128, c: u128) -> u128 {
    if c == 0 {
        return 0;
    }
    match a.checked_mul(b) {
        Some(product) => product / c,
        None => (a / c)
            .saturating_mul(b)
            .saturating_add((a % c).saturating_mul(b) / c),
    }
}

/// Requestor lookups over a state snapshot.
pub struct RequestorStateView<'a> {
    state: &'a dyn StateAccess,
}

impl<'a> RequestorStateView<'a> {
    /// Wraps a state snapshot.
    pub fn new(state: &'a dyn StateAccess) -> Self {
        Self { state }
    }
}

impl RequestorView for RequestorStateView<'_> {
    fn requestor(&self, address: &Address) -> Result<Option<Requestor>, StateError> {
        get_actor(self.state, address)
    }

    fn staked_requestors(&self) -> Result<Vec<Requestor>, StateError> {
        staked_actors(self.state)
    }
}
