// Path: crates/api/src/state/tests/mod.rs
use crate::state::{get_decoded, put_encoded, scan_decoded, StateAccess, StateScanIter};
use std::collections::BTreeMap;
use std::sync::Arc;
use viper_types::error::StateError;

#[derive(Default)]
struct MockState {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl StateAccess for MockState {
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
            self.delete(key)?;
        }
        for (key, value) in inserts {
            self.insert(key, value)?;
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        let prefix = prefix.to_vec();
        let iter = self
            .data
            .range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| Ok((Arc::from(k.as_slice()), Arc::from(v.as_slice()))));
        Ok(Box::new(iter))
    }
}

#[test]
fn typed_helpers_roundtrip() {
    let mut state = MockState::default();
    put_encoded(&mut state, b"viper::a", &42u64).unwrap();
    put_encoded(&mut state, b"viper::b", &7u64).unwrap();
    put_encoded(&mut state, b"other::c", &1u64).unwrap();

    assert_eq!(get_decoded::<u64>(&state, b"viper::a").unwrap(), Some(42));
    assert_eq!(get_decoded::<u64>(&state, b"viper::z").unwrap(), None);

    let scanned = scan_decoded::<u64>(&state, b"viper::").unwrap();
    assert_eq!(
        scanned,
        vec![(b"viper::a".to_vec(), 42), (b"viper::b".to_vec(), 7)]
    );
}

#[test]
fn decode_errors_surface_as_state_errors() {
    let mut state = MockState::default();
    state.insert(b"k", &[1, 2, 3]).unwrap();
    let err = get_decoded::<u64>(&state, b"k").unwrap_err();
    assert!(matches!(err, StateError::Decode(_)));
}

#[test]
fn boxed_state_delegates() {
    let mut boxed: Box<dyn StateAccess> = Box::new(MockState::default());
    boxed
        .batch_apply(&[(b"x".to_vec(), b"1".to_vec())], &[])
        .unwrap();
    assert_eq!(boxed.get(b"x").unwrap(), Some(b"1".to_vec()));
    boxed.batch_apply(&[], &[b"x".to_vec()]).unwrap();
    assert_eq!(boxed.get(b"x").unwrap(), None);
}
