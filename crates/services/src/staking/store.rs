// Path: crates/services/src/staking/store.rs
//! The staking tables: every actor by address, the staking set ranked by
//! power, the unstaking queue bucketed by completion time, and burn totals.

use super::StakedActor;
use viper_api::state::{get_decoded, put_encoded, scan_decoded, StateAccess};
use viper_types::app::Address;
use viper_types::error::StateError;
use viper_types::keys::{
    actor_key, all_actors_prefix, burn_key, staked_set_key, staked_set_prefix,
    unstaking_queue_key, unstaking_queue_prefix,
};

/// Reads an actor record.
pub fn get_actor<A: StakedActor>(
    state: &dyn StateAccess,
    address: &Address,
) -> Result<Option<A>, StateError> {
    get_decoded(state, &actor_key(A::KIND, address))
}

/// Writes an actor record. The staking set is maintained separately.
pub fn set_actor<A: StakedActor>(state: &mut dyn StateAccess, actor: &A) -> Result<(), StateError> {
    put_encoded(state, &actor_key(A::KIND, &actor.address()), actor)
}

/// Every actor record, in address order.
pub fn all_actors<A: StakedActor>(state: &dyn StateAccess) -> Result<Vec<A>, StateError> {
    Ok(scan_decoded::<A>(state, &all_actors_prefix(A::KIND))?
        .into_iter()
        .map(|(_, actor)| actor)
        .collect())
}

/// Adds the actor to the staking set under its current stake.
pub fn insert_staked<A: StakedActor>(state: &mut dyn StateAccess, actor: &A) -> Result<(), StateError> {
    let address = actor.address();
    put_encoded(
        state,
        &staked_set_key(A::KIND, actor.staked_tokens(), &address),
        &address,
    )
}

/// Removes the actor's staking-set entry under its current stake. Must run
/// before the stake changes.
pub fn remove_staked<A: StakedActor>(state: &mut dyn StateAccess, actor: &A) -> Result<(), StateError> {
    state.delete(&staked_set_key(A::KIND, actor.staked_tokens(), &actor.address()))
}

/// Addresses in the staking set, highest power first.
pub fn staked_addresses<A: StakedActor>(state: &dyn StateAccess) -> Result<Vec<Address>, StateError> {
    let mut addresses: Vec<Address> = scan_decoded::<Address>(state, &staked_set_prefix(A::KIND))?
        .into_iter()
        .map(|(_, address)| address)
        .collect();
    addresses.reverse();
    Ok(addresses)
}

/// Actors in the staking set, highest power first.
pub fn staked_actors<A: StakedActor>(state: &dyn StateAccess) -> Result<Vec<A>, StateError> {
    let mut out = Vec::new();
    for address in staked_addresses::<A>(state)? {
        match get_actor::<A>(state, &address)? {
            Some(actor) => out.push(actor),
            None => {
                tracing::warn!(
                    target: "staking",
                    kind = A::KIND.as_str(),
                    %address,
                    "staking set entry without an actor record"
                );
            }
        }
    }
    Ok(out)
}

/// The number of actors in the staking set.
pub fn staked_count<A: StakedActor>(state: &dyn StateAccess) -> Result<u64, StateError> {
    let mut count = 0u64;
    for item in state.prefix_scan(&staked_set_prefix(A::KIND))? {
        item?;
        count += 1;
    }
    Ok(count)
}

/// Appends the actor to the queue bucket of its completion time.
pub fn enqueue_unstaking<A: StakedActor>(state: &mut dyn StateAccess, actor: &A) -> Result<(), StateError> {
    let key = unstaking_queue_key(A::KIND, actor.unstaking_completion_time());
    let mut bucket: Vec<Address> = get_decoded(state, &key)?.unwrap_or_default();
    if !bucket.contains(&actor.address()) {
        bucket.push(actor.address());
    }
    put_encoded(state, &key, &bucket)
}

/// Drops the actor from its queue bucket, deleting the bucket when it empties.
pub fn dequeue_unstaking<A: StakedActor>(state: &mut dyn StateAccess, actor: &A) -> Result<(), StateError> {
    let key = unstaking_queue_key(A::KIND, actor.unstaking_completion_time());
    let Some(mut bucket) = get_decoded::<Vec<Address>>(state, &key)? else {
        return Ok(());
    };
    bucket.retain(|a| *a != actor.address());
    if bucket.is_empty() {
        state.delete(&key)
    } else {
        put_encoded(state, &key, &bucket)
    }
}

/// Queue buckets whose completion time is at or before `now`, oldest first.
pub fn matured_unstaking<A: StakedActor>(
    state: &dyn StateAccess,
    now: u64,
) -> Result<Vec<(Vec<u8>, Vec<Address>)>, StateError> {
    let prefix = unstaking_queue_prefix(A::KIND);
    let mut out = Vec::new();
    for (key, bucket) in scan_decoded::<Vec<Address>>(state, &prefix)? {
        let time = key
            .get(prefix.len()..)
            .and_then(|b| <[u8; 8]>::try_from(b).ok())
            .map(u64::from_be_bytes)
            .ok_or_else(|| StateError::InvalidValue("malformed unstaking queue key".into()))?;
        if time > now {
            break;
        }
        out.push((key, bucket));
    }
    Ok(out)
}

/// Adds `amount` to the actor's cumulative burn.
pub fn record_burn<A: StakedActor>(
    state: &mut dyn StateAccess,
    address: &Address,
    amount: u64,
) -> Result<u64, StateError> {
    let key = burn_key(A::KIND, address);
    let total = get_decoded::<u64>(state, &key)?
        .unwrap_or(0)
        .saturating_add(amount);
    put_encoded(state, &key, &total)?;
    Ok(total)
}

/// The actor's cumulative burn.
pub fn burned<A: StakedActor>(state: &dyn StateAccess, address: &Address) -> Result<u64, StateError> {
    Ok(get_decoded(state, &burn_key(A::KIND, address))?.unwrap_or(0))
}
