// Path: crates/node/src/fisherman/pool.rs
//! Per-chain sample payloads.

use crate::error::{read_json, NodeError};
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::path::Path;
use viper_types::app::Payload;

/// Payloads the fisherman draws its samples from. The file is a JSON object
/// mapping chain ids to arrays of payloads.
#[derive(Debug, Clone, Default)]
pub struct SamplePool {
    payloads: HashMap<String, Vec<Payload>>,
}

impl SamplePool {
    /// A pool over `payloads`; chains with no payloads are dropped.
    pub fn new(payloads: HashMap<String, Vec<Payload>>) -> Self {
        Self {
            payloads: payloads.into_iter().filter(|(_, p)| !p.is_empty()).collect(),
        }
    }

    /// Loads the pool from `path`.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        Ok(Self::new(read_json(path)?))
    }

    /// A random payload for `chain`.
    pub fn draw(&self, chain: &str) -> Option<Payload> {
        self.payloads
            .get(chain)
            .and_then(|p| p.choose(&mut rand::thread_rng()))
            .cloned()
    }

    /// Whether `chain` can be sampled.
    pub fn covers(&self, chain: &str) -> bool {
        self.payloads.contains_key(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_draws() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        std::fs::write(
            &path,
            r#"{"0001":[{"data":"{\"method\":\"eth_blockNumber\"}","method":"POST"},
                        {"data":"{\"method\":\"eth_chainId\"}"}],
                "0002":[]}"#,
        )
        .unwrap();
        let pool = SamplePool::load(&path).unwrap();
        assert!(pool.covers("0001"));
        assert!(!pool.covers("0002"));
        for _ in 0..10 {
            let payload = pool.draw("0001").unwrap();
            assert!(payload.data.contains("eth_"));
        }
        assert!(pool.draw("0003").is_none());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SamplePool::load(Path::new("/nonexistent/pool.json")).unwrap_err();
        assert!(matches!(err, NodeError::Io { .. }));
    }
}
