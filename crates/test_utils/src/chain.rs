// Path: crates/test_utils/src/chain.rs
//! A scripted host chain: heights, deterministic block hashes and state snapshots.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use viper_api::chain::ChainView;
use viper_api::state::StateAccess;
use viper_state::memory::MemoryState;
use viper_types::app::Hash32;
use viper_types::hash::sha256_concat;

/// Unix time of height zero.
pub const GENESIS_TIME: u64 = 1_700_000_000;
/// Seconds between blocks.
pub const BLOCK_TIME_SECS: u64 = 60;

#[derive(Default)]
struct Inner {
    height: u64,
    states: BTreeMap<u64, Arc<dyn StateAccess>>,
    synced: bool,
}

/// A chain whose block hashes are `sha256("block" || be64(height))` and whose
/// state at each height is a snapshot taken by [`MockChain::commit`].
pub struct MockChain {
    inner: RwLock<Inner>,
}

impl std::fmt::Debug for MockChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockChain")
            .field("height", &self.inner.read().height)
            .finish()
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    /// A synced chain at height zero with no state.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                synced: true,
                ..Default::default()
            }),
        }
    }

    /// The hash every mock chain gives `height`.
    pub fn hash_at(height: u64) -> Hash32 {
        sha256_concat(&[b"block", &height.to_be_bytes()])
    }

    /// The block time of `height`.
    pub fn time_at(height: u64) -> u64 {
        GENESIS_TIME + height * BLOCK_TIME_SECS
    }

    /// Records `state` as committed at `height` and moves the head there if it
    /// is ahead. Heights skipped on the way inherit the same snapshot.
    pub fn commit(&self, height: u64, state: &MemoryState) {
        let snapshot = state.snapshot();
        let mut inner = self.inner.write();
        let from = if height > inner.height {
            inner.height + 1
        } else {
            height
        };
        for h in from..=height {
            inner.states.insert(h, Arc::clone(&snapshot));
        }
        inner.height = inner.height.max(height);
    }

    /// Marks the node as catching up (or caught up).
    pub fn set_synced(&self, synced: bool) {
        self.inner.write().synced = synced;
    }
}

impl ChainView for MockChain {
    fn latest_height(&self) -> u64 {
        self.inner.read().height
    }

    fn block_hash(&self, height: u64) -> Option<Hash32> {
        (height <= self.latest_height()).then(|| Self::hash_at(height))
    }

    fn block_time(&self, height: u64) -> Option<u64> {
        (height <= self.latest_height()).then(|| Self::time_at(height))
    }

    fn is_synced(&self) -> bool {
        self.inner.read().synced
    }

    fn state_at(&self, height: u64) -> Option<Arc<dyn StateAccess>> {
        self.inner.read().states.get(&height).cloned()
    }
}
