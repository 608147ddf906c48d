// Path: crates/services/src/staking/lifecycle.rs
//! Transitions shared by requestors and servicers.
//!
//! Every transition keeps two invariants: a jailed actor is never in the
//! staking set, and an actor is `Unstaking` exactly while it sits in the
//! unstaking queue.

use super::store::*;
use super::StakedActor;
use viper_api::ledger::{Ledger, LedgerError};
use viper_api::state::StateAccess;
use viper_types::app::{Address, StakeStatus};
use viper_types::config::StakingParams;
use viper_types::error::StakingError;

pub(crate) fn ledger_error(e: LedgerError) -> StakingError {
    match e {
        LedgerError::InsufficientFunds { .. } => StakingError::InsufficientFunds,
        other => StakingError::Ledger(other.to_string()),
    }
}

/// Reads an actor that must exist.
pub fn require_actor<A: StakedActor>(
    state: &dyn StateAccess,
    address: &Address,
) -> Result<A, StakingError> {
    get_actor::<A>(state, address)?.ok_or_else(|| StakingError::ActorNotFound(address.to_hex()))
}

/// Moves a staked, unjailed actor into the unstaking queue.
pub fn begin_unstake<A: StakedActor>(
    state: &mut dyn StateAccess,
    params: &StakingParams,
    address: &Address,
    block_time: u64,
) -> Result<A, StakingError> {
    let mut actor = require_actor::<A>(state, address)?;
    match actor.status() {
        StakeStatus::Staked => {}
        StakeStatus::Unstaking => return Err(StakingError::AlreadyUnstaking),
        StakeStatus::Unstaked => return Err(StakingError::NotStaked),
    }
    if actor.is_jailed() {
        return Err(StakingError::Jailed);
    }

    remove_staked(state, &actor)?;
    actor.set_status(StakeStatus::Unstaking);
    actor.set_unstaking_completion_time(block_time.saturating_add(params.unstaking_period_secs));
    set_actor(state, &actor)?;
    enqueue_unstaking(state, &actor)?;

    tracing::info!(
        target: "staking",
        kind = A::KIND.as_str(),
        %address,
        completion_time = actor.unstaking_completion_time(),
        "began unstaking"
    );
    Ok(actor)
}

/// Returns the stake of every actor whose unstaking completed at or before
/// `now`. Returns the addresses released.
pub fn finish_unstaking<A: StakedActor>(
    state: &mut dyn StateAccess,
    ledger: &mut dyn Ledger,
    now: u64,
) -> Result<Vec<Address>, StakingError> {
    let mut released = Vec::new();
    for (key, bucket) in matured_unstaking::<A>(state, now)? {
        for address in bucket {
            let Some(mut actor) = get_actor::<A>(state, &address)? else {
                continue;
            };
            // Burns and re-stakes can move an actor out of the queue between
            // enqueue and sweep; only a still-unstaking record is released.
            if actor.status() != StakeStatus::Unstaking {
                continue;
            }
            release(state, ledger, &mut actor)?;
            released.push(address);
        }
        state.delete(&key)?;
    }
    if !released.is_empty() {
        tracing::info!(
            target: "staking",
            kind = A::KIND.as_str(),
            count = released.len(),
            "finished unstaking"
        );
    }
    Ok(released)
}

fn release<A: StakedActor>(
    state: &mut dyn StateAccess,
    ledger: &mut dyn Ledger,
    actor: &mut A,
) -> Result<(), StakingError> {
    let tokens = actor.staked_tokens();
    if tokens > 0 {
        ledger
            .send_from_pool(A::POOL, &actor.address(), tokens)
            .map_err(ledger_error)?;
    }
    actor.set_staked_tokens(0);
    actor.set_status(StakeStatus::Unstaked);
    actor.set_unstaking_completion_time(0);
    actor.on_unstaked();
    set_actor(state, actor)?;
    Ok(())
}

/// Jails an actor and drops it from the staking set.
pub fn jail<A: StakedActor>(state: &mut dyn StateAccess, address: &Address) -> Result<A, StakingError> {
    let mut actor = require_actor::<A>(state, address)?;
    if actor.is_jailed() {
        return Ok(actor);
    }
    if actor.in_staking_set() {
        remove_staked(state, &actor)?;
    }
    actor.set_jailed(true);
    set_actor(state, &actor)?;
    tracing::warn!(target: "staking", kind = A::KIND.as_str(), %address, "jailed");
    Ok(actor)
}

/// Clears the jailed flag of a staked actor still holding the minimum stake.
pub fn unjail<A: StakedActor>(
    state: &mut dyn StateAccess,
    params: &StakingParams,
    address: &Address,
) -> Result<A, StakingError> {
    let mut actor = require_actor::<A>(state, address)?;
    if !actor.is_jailed() {
        return Err(StakingError::NotJailed);
    }
    if actor.status() != StakeStatus::Staked {
        return Err(StakingError::NotStaked);
    }
    if actor.staked_tokens() < params.minimum_stake {
        return Err(StakingError::MinimumStake {
            got: actor.staked_tokens(),
            min: params.minimum_stake,
        });
    }
    actor.set_jailed(false);
    set_actor(state, &actor)?;
    insert_staked(state, &actor)?;
    tracing::info!(target: "staking", kind = A::KIND.as_str(), %address, "unjailed");
    Ok(actor)
}

/// Burns up to `amount` of an actor's stake. An actor left below the minimum
/// is force-unstaked and its remaining stake returned. Returns the amount
/// actually burned.
pub fn burn<A: StakedActor>(
    state: &mut dyn StateAccess,
    ledger: &mut dyn Ledger,
    params: &StakingParams,
    address: &Address,
    amount: u64,
) -> Result<u64, StakingError> {
    let mut actor = require_actor::<A>(state, address)?;
    let burned = amount.min(actor.staked_tokens());
    if burned == 0 {
        return Ok(0);
    }

    let ranked = actor.in_staking_set();
    if ranked {
        remove_staked(state, &actor)?;
    }
    ledger.burn_from_pool(A::POOL, burned).map_err(ledger_error)?;
    actor.set_staked_tokens(actor.staked_tokens() - burned);
    let total = record_burn::<A>(state, address, burned)?;

    tracing::warn!(
        target: "staking",
        kind = A::KIND.as_str(),
        %address,
        burned,
        total_burned = total,
        remaining = actor.staked_tokens(),
        "burned stake"
    );

    if actor.status() != StakeStatus::Unstaked && actor.staked_tokens() < params.minimum_stake {
        return force_unstake(state, ledger, actor).map(|_| burned);
    }
    set_actor(state, &actor)?;
    if ranked {
        insert_staked(state, &actor)?;
    }
    Ok(burned)
}

fn force_unstake<A: StakedActor>(
    state: &mut dyn StateAccess,
    ledger: &mut dyn Ledger,
    mut actor: A,
) -> Result<(), StakingError> {
    if actor.status() == StakeStatus::Unstaking {
        dequeue_unstaking(state, &actor)?;
    }
    release(state, ledger, &mut actor)?;
    tracing::warn!(
        target: "staking",
        kind = A::KIND.as_str(),
        address = %actor.address(),
        "force unstaked below minimum stake"
    );
    Ok(())
}
