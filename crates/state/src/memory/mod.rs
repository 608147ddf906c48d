// Path: crates/state/src/memory/mod.rs
//! An ordered in-memory key-value store.
//!
//! Cloning is a full snapshot, which is how hosts and tests keep the state
//! committed at past heights for session reconstruction.

use std::collections::BTreeMap;
use std::sync::Arc;
use viper_api::state::{StateAccess, StateScanIter};
use viper_types::error::StateError;

/// A `BTreeMap`-backed `StateAccess`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryState {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryState {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of stored keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// A shareable copy of the current contents.
    pub fn snapshot(&self) -> Arc<dyn StateAccess> {
        Arc::new(self.clone())
    }
}

impl StateAccess for MemoryState {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.data.get(key).cloned())
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.data.remove(key);
        Ok(())
    }

    fn batch_apply(
        &mut self,
        inserts: &[(Vec<u8>, Vec<u8>)],
        deletes: &[Vec<u8>],
    ) -> Result<(), StateError> {
        for key in deletes {
            self.data.remove(key);
        }
        for (key, value) in inserts {
            self.data.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        let owned = prefix.to_vec();
        let iter = self
            .data
            .range(owned.clone()..)
            .take_while(move |(k, _)| k.starts_with(&owned))
            .map(|(k, v)| Ok((Arc::from(k.as_slice()), Arc::from(v.as_slice()))));
        Ok(Box::new(iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viper_api::state::{get_decoded, put_encoded, scan_decoded};

    #[test]
    fn prefix_scan_is_ordered_and_bounded() {
        let mut state = MemoryState::new();
        state.insert(b"viper::\x02b", b"2").unwrap();
        state.insert(b"viper::\x02a", b"1").unwrap();
        state.insert(b"viper::\x03a", b"3").unwrap();
        state.insert(b"servicers::\x01", b"x").unwrap();

        let keys: Vec<Vec<u8>> = state
            .prefix_scan(b"viper::\x02")
            .unwrap()
            .map(|r| r.unwrap().0.to_vec())
            .collect();
        assert_eq!(keys, vec![b"viper::\x02a".to_vec(), b"viper::\x02b".to_vec()]);
        assert_eq!(state.prefix_scan(b"viper::").unwrap().count(), 3);
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let mut state = MemoryState::new();
        put_encoded(&mut state, b"k", &1u64).unwrap();
        let snap = state.snapshot();
        put_encoded(&mut state, b"k", &2u64).unwrap();
        assert_eq!(get_decoded::<u64>(snap.as_ref(), b"k").unwrap(), Some(1));
        assert_eq!(get_decoded::<u64>(&state, b"k").unwrap(), Some(2));
    }

    #[test]
    fn batch_apply_deletes_then_inserts() {
        let mut state = MemoryState::new();
        state.insert(b"a", b"1").unwrap();
        state
            .batch_apply(&[(b"a".to_vec(), b"2".to_vec())], &[b"a".to_vec()])
            .unwrap();
        assert_eq!(state.get(b"a").unwrap(), Some(b"2".to_vec()));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn scan_decoded_reads_typed_values() {
        let mut state = MemoryState::new();
        put_encoded(&mut state, b"p\x01", &10u64).unwrap();
        put_encoded(&mut state, b"p\x02", &20u64).unwrap();
        let values: Vec<u64> = scan_decoded::<u64>(&state, b"p")
            .unwrap()
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        assert_eq!(values, vec![10, 20]);
    }
}
