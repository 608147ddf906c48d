// Path: crates/api/src/state/mod.rs
//! Key-value state access for the keepers.
//!
//! Keepers never see the host's state tree; they receive a `StateAccess` for
//! the block being processed and read historical state through `ChainView`.

use std::sync::Arc;
use viper_types::error::StateError;

/// An atomically reference-counted, owned key slice.
pub type StateKey = Arc<[u8]>;
/// An atomically reference-counted, owned value slice.
pub type StateVal = Arc<[u8]>;
/// An owned key-value pair from the state.
pub type StateKVPair = (StateKey, StateVal);
/// A streaming iterator over key-value pairs in ascending key order.
pub type StateScanIter<'a> = Box<dyn Iterator<Item = Result<StateKVPair, StateError>> + Send + 'a>;

mod accessor;

pub use accessor::*;

#[cfg(test)]
mod tests;
