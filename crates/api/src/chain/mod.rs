// Path: crates/api/src/chain/mod.rs
//! Read access to the host chain.

use crate::state::StateAccess;
use std::sync::Arc;
use viper_types::app::Hash32;

/// Heights, block hashes, block times and committed state of the host chain.
///
/// Sessions must be reconstructible from the block hash and staking set at
/// session start, so implementations keep enough history to answer for any
/// height still inside the claim window.
pub trait ChainView: Send + Sync {
    /// The latest committed height.
    fn latest_height(&self) -> u64;

    /// The hash of the block at `height`, if known.
    fn block_hash(&self, height: u64) -> Option<Hash32>;

    /// The unix time (seconds) of the block at `height`, if known.
    fn block_time(&self, height: u64) -> Option<u64>;

    /// Whether the node has caught up with the network.
    fn is_synced(&self) -> bool;

    /// State as committed at `height`.
    fn state_at(&self, height: u64) -> Option<Arc<dyn StateAccess>>;

    /// State as committed at the latest height.
    fn latest_state(&self) -> Option<Arc<dyn StateAccess>> {
        self.state_at(self.latest_height())
    }
}
