// Path: crates/types/src/config/mod.rs

//! Node configuration. On-chain parameters live in [`params`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// On-chain parameters of the claim/proof keeper and the staking modules.
pub mod params;
pub use params::*;

/// Lower clamp of the outbound relay timeout, in milliseconds.
pub const MIN_RPC_TIMEOUT_MS: u64 = 1;
/// Upper clamp of the outbound relay timeout, in milliseconds.
pub const MAX_RPC_TIMEOUT_MS: u64 = 1_000_000;

/// Local configuration of one servicer/fisherman node, loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeConfig {
    /// Outbound relay timeout; clamped to `[1, 10^6]` ms.
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
    /// Directory holding the evidence database and key file.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// File name of the evidence database inside `data_dir`.
    #[serde(default = "default_evidence_db_name")]
    pub evidence_db_name: String,
    /// Hex-encoded Ed25519 seed of the node key, relative to `data_dir`.
    #[serde(default = "default_key_file")]
    pub key_file: String,
    /// JSON map of hosted chains.
    #[serde(default)]
    pub chains_path: Option<PathBuf>,
    /// JSON list of hosted geo zones.
    #[serde(default)]
    pub geo_zones_path: Option<PathBuf>,
    /// JSON map of fisherman sample payloads per chain.
    #[serde(default)]
    pub sample_pool_path: Option<PathBuf>,
    /// Listen address of the metrics server; disabled when unset.
    #[serde(default)]
    pub prometheus_addr: Option<String>,
    /// Run several nodes in one process.
    #[serde(default)]
    pub lean_viper: bool,
    /// Log every rejected relay.
    #[serde(default = "default_true")]
    pub relay_errors: bool,
    /// Validate Merkle proofs locally before broadcasting them.
    #[serde(default)]
    pub proof_prevalidation: bool,
    /// Sessions after which unproven evidence is discarded.
    #[serde(default = "default_max_claim_age")]
    pub max_claim_age_for_proof_retry: u64,
    /// Interval of the background evidence flush.
    #[serde(default = "default_flush_interval")]
    pub evidence_flush_interval_secs: u64,
    /// Expected proofs per evidence set; sizes the bloom filters.
    #[serde(default = "default_bloom_expected_items")]
    pub bloom_expected_items: u64,
    /// Pause between fisherman sampling rounds.
    #[serde(default = "default_sample_interval")]
    pub fisherman_sample_interval_ms: u64,
    /// Sessions a client's block height may lag or lead the node.
    #[serde(default = "default_sync_allowance")]
    pub client_block_sync_allowance: u64,
    /// Blocks a cached session outlives its end height.
    #[serde(default = "default_session_retention")]
    pub session_retention_blocks: u64,
}

fn default_rpc_timeout_ms() -> u64 {
    3_000
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_evidence_db_name() -> String {
    "evidence.redb".to_string()
}
fn default_key_file() -> String {
    "node_key.hex".to_string()
}
fn default_true() -> bool {
    true
}
fn default_max_claim_age() -> u64 {
    32
}
fn default_flush_interval() -> u64 {
    30
}
fn default_bloom_expected_items() -> u64 {
    10_000
}
fn default_sample_interval() -> u64 {
    10_000
}
fn default_sync_allowance() -> u64 {
    1
}
fn default_session_retention() -> u64 {
    32
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_ms: default_rpc_timeout_ms(),
            data_dir: default_data_dir(),
            evidence_db_name: default_evidence_db_name(),
            key_file: default_key_file(),
            chains_path: None,
            geo_zones_path: None,
            sample_pool_path: None,
            prometheus_addr: None,
            lean_viper: false,
            relay_errors: true,
            proof_prevalidation: false,
            max_claim_age_for_proof_retry: default_max_claim_age(),
            evidence_flush_interval_secs: default_flush_interval(),
            bloom_expected_items: default_bloom_expected_items(),
            fisherman_sample_interval_ms: default_sample_interval(),
            client_block_sync_allowance: default_sync_allowance(),
            session_retention_blocks: default_session_retention(),
        }
    }
}

impl NodeConfig {
    /// Parses a TOML document; missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, String> {
        toml::from_str(s).map_err(|e| format!("invalid node config: {}", e))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        Self::from_toml_str(&raw)
    }

    /// The outbound relay timeout, clamped.
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(
            self.rpc_timeout_ms
                .clamp(MIN_RPC_TIMEOUT_MS, MAX_RPC_TIMEOUT_MS),
        )
    }

    /// Full path of the evidence database.
    pub fn evidence_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.evidence_db_name)
    }

    /// Full path of the node key file.
    pub fn key_file_path(&self) -> PathBuf {
        self.data_dir.join(&self.key_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_takes_defaults() {
        let cfg = NodeConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, NodeConfig::default());
        assert_eq!(cfg.rpc_timeout(), Duration::from_millis(3_000));
        assert!(cfg.evidence_db_path().ends_with("evidence.redb"));
    }

    #[test]
    fn rpc_timeout_is_clamped() {
        let cfg = NodeConfig::from_toml_str("rpc_timeout_ms = 0").unwrap();
        assert_eq!(cfg.rpc_timeout(), Duration::from_millis(1));
        let cfg = NodeConfig::from_toml_str("rpc_timeout_ms = 5000000").unwrap();
        assert_eq!(cfg.rpc_timeout(), Duration::from_millis(1_000_000));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(
            &path,
            "data_dir = \"/var/lib/viper\"\nproof_prevalidation = true\nprometheus_addr = \"127.0.0.1:9090\"\n",
        )
        .unwrap();
        let cfg = NodeConfig::load(&path).unwrap();
        assert!(cfg.proof_prevalidation);
        assert_eq!(cfg.prometheus_addr.as_deref(), Some("127.0.0.1:9090"));
        assert_eq!(cfg.evidence_db_path(), PathBuf::from("/var/lib/viper/evidence.redb"));
        assert!(NodeConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
