// Path: crates/api/src/transaction/mod.rs
//! Transaction context and broadcasting.

use crate::chain::ChainView;
use async_trait::async_trait;
use thiserror::Error;
use viper_types::app::{Address, Hash32, Msg};
use viper_types::error::{ErrorCode, TxResult};

/// A transaction hash.
pub type TxHash = Hash32;

/// Read-only context for handling one message or end-block hook.
#[derive(Clone, Copy)]
pub struct TxContext<'a> {
    /// The height of the block being processed.
    pub block_height: u64,
    /// The block's unix time in seconds, from its header.
    pub block_time: u64,
    /// The address that signed the transaction; zero for end-block hooks.
    pub signer: Address,
    /// Historical block hashes and state.
    pub chain: &'a dyn ChainView,
}

/// Broadcast failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    /// The account cannot pay the message fee.
    #[error("Insufficient fee funds")]
    InsufficientFee,
    /// The host rejected the transaction.
    #[error("Transaction rejected: {} {}", .0.code, .0.log)]
    Rejected(TxResult),
    /// The transaction could not be delivered.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ErrorCode for BroadcastError {
    fn code(&self) -> &'static str {
        match self {
            Self::InsufficientFee => "BROADCAST_INSUFFICIENT_FEE",
            Self::Rejected(_) => "BROADCAST_REJECTED",
            Self::Transport(_) => "BROADCAST_TRANSPORT",
        }
    }
}

/// Builds, signs and submits a transaction carrying one message.
#[async_trait]
pub trait TxBroadcaster: Send + Sync {
    /// Broadcasts `msg`, returning the transaction hash.
    async fn broadcast(&self, msg: Msg) -> Result<TxHash, BroadcastError>;
}
