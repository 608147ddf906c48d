// Path: crates/node/src/error.rs
//! Errors raised while loading a node's local files.

use std::path::PathBuf;
use thiserror::Error;
use viper_types::error::ErrorCode;

/// Failures reading the hosted-chain, geo-zone and sample-pool files.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not the expected JSON shape.
    #[error("Malformed {path}: {source}")]
    Malformed {
        /// The file.
        path: PathBuf,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },
    /// A hosted chain entry is unusable.
    #[error("Invalid hosted chain {id}: {reason}")]
    InvalidChain {
        /// The chain identifier.
        id: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ErrorCode for NodeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "NODE_IO",
            Self::Malformed { .. } => "NODE_MALFORMED_FILE",
            Self::InvalidChain { .. } => "NODE_INVALID_CHAIN",
        }
    }
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<T, NodeError> {
    let bytes = std::fs::read(path).map_err(|source| NodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| NodeError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}
