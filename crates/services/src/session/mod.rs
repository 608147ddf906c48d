// Path: crates/services/src/session/mod.rs
//! Pseudorandom session assembly.
//!
//! A session is a pure function of the requestor, the chain, the hash of the
//! session's first block and the staking set committed at that block. Live
//! state only ever removes candidates: a servicer jailed or unstaked since the
//! session opened is skipped, never replaced by someone outside the draw.

mod cache;

pub use cache::SessionCache;

use crate::staking::{get_actor, ServicerStateView};
use std::collections::HashSet;
use viper_api::chain::ChainView;
use viper_api::staking::StakingView;
use viper_api::state::StateAccess;
use viper_state::random::{session_key, KeyStream};
use viper_types::app::{is_session_block, Address, Hash32, Requestor, Servicer, Session, SessionHeader};
use viper_types::config::ViperParams;
use viper_types::error::ViperError;

/// Random draws per candidate before the remaining candidates are swept in
/// ranking order.
const DRAWS_PER_CANDIDATE: usize = 16;

/// The number of servicers a session carries: the header's override, then the
/// requestor's preference, then the network default.
pub fn effective_session_size(header: &SessionHeader, requestor: Option<&Requestor>, params: &ViperParams) -> u64 {
    header
        .num_servicers
        .or_else(|| requestor.and_then(|r| r.num_servicers))
        .unwrap_or(params.session_servicer_count)
}

/// Rejects a billable header whose optional fields differ from the requestor's
/// stake.
///
/// Evidence, claims and quota are keyed by the header hash, so each variant
/// would otherwise carry its own allowance. The session size must equal the
/// staked `num_servicers` (both absent means the network default) and the
/// zone must be the requestor's first advertised zone, or absent if it has none.
pub fn check_billable_header(header: &SessionHeader, requestor: &Requestor) -> Result<(), ViperError> {
    if header.num_servicers != requestor.num_servicers {
        return Err(ViperError::InvalidSession(format!(
            "num_servicers {:?} does not match the requestor's {:?}",
            header.num_servicers, requestor.num_servicers
        )));
    }
    let zone = requestor.geo_zones.first();
    if header.geo_zone.as_ref() != zone {
        return Err(ViperError::InvalidSession(format!(
            "geo zone {:?} does not match the requestor's {:?}",
            header.geo_zone, zone
        )));
    }
    Ok(())
}

fn live_eligible(live: &dyn StakingView, address: &Address, chain: &str) -> Result<bool, ViperError> {
    Ok(live
        .servicer(address)?
        .map(|s| s.is_eligible_for(chain))
        .unwrap_or(false))
}

/// Draws `size` servicers and up to `fishermen` fishermen for `header`.
///
/// `at_start` is the staking set committed at the session's first block;
/// `live` is the current one.
pub fn new_session(
    at_start: &dyn StakingView,
    live: &dyn StakingView,
    header: &SessionHeader,
    block_hash: &Hash32,
    size: u64,
    fishermen: u64,
) -> Result<Session, ViperError> {
    let key = session_key(header, block_hash);
    let candidates: Vec<Servicer> = at_start
        .staked_servicers_for_chain(&header.chain)?
        .into_iter()
        .filter(|s| header.geo_zone.as_deref().map_or(true, |zone| s.serves_zone(zone)))
        .collect();

    let available = candidates.len() as u64;
    if available < size {
        return Err(ViperError::InsufficientServicers {
            available,
            required: size,
        });
    }

    let mut stream = KeyStream::new(key);
    let mut visited: HashSet<usize> = HashSet::with_capacity(candidates.len());
    let mut servicers: Vec<Address> = Vec::with_capacity(size as usize);
    let max_draws = candidates.len().saturating_mul(DRAWS_PER_CANDIDATE);
    let mut draws = 0usize;

    while (servicers.len() as u64) < size {
        if visited.len() == candidates.len() {
            return Err(ViperError::InsufficientServicers {
                available: servicers.len() as u64,
                required: size,
            });
        }
        let index = if draws < max_draws {
            draws += 1;
            stream.draw(available) as usize
        } else {
            // Bounded fallback: the lowest-ranked unvisited candidate.
            match (0..candidates.len()).find(|i| !visited.contains(i)) {
                Some(i) => i,
                None => continue,
            }
        };
        if !visited.insert(index) {
            continue;
        }
        let Some(candidate) = candidates.get(index) else {
            continue;
        };
        if live_eligible(live, &candidate.address, &header.chain)? {
            servicers.push(candidate.address);
        } else {
            tracing::debug!(
                target: "session",
                servicer = %candidate.address,
                "skipping servicer no longer eligible"
            );
        }
    }

    let mut pool: Vec<Address> = Vec::new();
    for candidate in candidates.iter().filter(|c| !servicers.contains(&c.address)) {
        if live_eligible(live, &candidate.address, &header.chain)? {
            pool.push(candidate.address);
        }
    }
    let mut drawn_fishermen = Vec::new();
    while (drawn_fishermen.len() as u64) < fishermen && !pool.is_empty() {
        let index = stream.draw(pool.len() as u64) as usize;
        if index < pool.len() {
            drawn_fishermen.push(pool.remove(index));
        }
    }

    Ok(Session {
        header: header.clone(),
        key,
        servicers,
        fishermen: drawn_fishermen,
    })
}

/// Reconstructs the session for `header` from the chain's history, with
/// `live` as the current state.
pub fn build_session(
    chain: &dyn ChainView,
    live: &dyn StateAccess,
    params: &ViperParams,
    header: &SessionHeader,
) -> Result<Session, ViperError> {
    header.validate_basic()?;
    let height = header.session_block_height;
    if !is_session_block(height, params.blocks_per_session) {
        return Err(ViperError::InvalidSession(format!(
            "height {} does not open a session",
            height
        )));
    }
    let block_hash = chain.block_hash(height).ok_or(ViperError::EmptyBlockId(height))?;
    let at_start = chain.state_at(height).ok_or(ViperError::EmptyBlockId(height))?;

    let requestor_address = header.requestor_pubkey.address();
    let requestor = get_actor::<Requestor>(at_start.as_ref(), &requestor_address)?
        .ok_or_else(|| ViperError::RequestorNotFound(requestor_address.to_hex()))?;
    let size = effective_session_size(header, Some(&requestor), params);

    let session = new_session(
        &ServicerStateView::new(at_start.as_ref(), params),
        &ServicerStateView::new(live, params),
        header,
        &block_hash,
        size,
        params.fishermen_per_session,
    )?;
    tracing::debug!(
        target: "session",
        chain = %header.chain,
        height,
        requestor = %requestor_address,
        servicers = session.servicers.len(),
        fishermen = session.fishermen.len(),
        "assembled session"
    );
    Ok(session)
}
