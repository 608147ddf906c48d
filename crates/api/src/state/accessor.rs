// Path: crates/api/src/state/accessor.rs
//! Defines the `StateAccess` trait and typed helpers over it.

use crate::state::StateScanIter;
use parity_scale_codec::{Decode, Encode};
use viper_types::codec;
use viper_types::error::StateError;

/// A dyn-safe key-value interface with single-item, batch and scanning methods.
pub trait StateAccess: Send + Sync {
    /// Gets a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError>;

    /// Inserts a key-value pair.
    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError>;

    /// Deletes a key-value pair.
    fn delete(&mut self, key: &[u8]) -> Result<(), StateError>;

    /// Atomically applies a batch of inserts/updates and deletes.
    fn batch_apply(
        &mut self,
        inserts: &[(Vec<u8>, Vec<u8>)],
        deletes: &[Vec<u8>],
    ) -> Result<(), StateError>;

    /// Scans for all key-value pairs starting with the given prefix, in
    /// ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError>;
}

impl<T: StateAccess + ?Sized> StateAccess for Box<T> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        (**self).get(key)
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        (**self).insert(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        (**self).delete(key)
    }

    fn batch_apply(
        &mut self,
        inserts: &[(Vec<u8>, Vec<u8>)],
        deletes: &[Vec<u8>],
    ) -> Result<(), StateError> {
        (**self).batch_apply(inserts, deletes)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        (**self).prefix_scan(prefix)
    }
}

/// Reads and SCALE-decodes a value.
pub fn get_decoded<T: Decode>(
    state: &(impl StateAccess + ?Sized),
    key: &[u8],
) -> Result<Option<T>, StateError> {
    match state.get(key)? {
        Some(bytes) => codec::from_bytes_canonical(&bytes)
            .map(Some)
            .map_err(StateError::Decode),
        None => Ok(None),
    }
}

/// SCALE-encodes and writes a value.
pub fn put_encoded<T: Encode>(
    state: &mut (impl StateAccess + ?Sized),
    key: &[u8],
    value: &T,
) -> Result<(), StateError> {
    let bytes = codec::to_bytes_canonical(value).map_err(StateError::InvalidValue)?;
    state.insert(key, &bytes)
}

/// Decodes every value under `prefix`, in key order.
pub fn scan_decoded<T: Decode>(
    state: &(impl StateAccess + ?Sized),
    prefix: &[u8],
) -> Result<Vec<(Vec<u8>, T)>, StateError> {
    let mut out = Vec::new();
    for item in state.prefix_scan(prefix)? {
        let (key, value) = item?;
        let decoded = codec::from_bytes_canonical(&value).map_err(StateError::Decode)?;
        out.push((key.to_vec(), decoded));
    }
    Ok(out)
}
