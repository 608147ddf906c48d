// Path: crates/api/src/lib.rs

//! # Viper API Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
#![deny(missing_docs)]
//! # Viper API
//!
//! The narrow capability interfaces between the relay core and its host. The
//! keepers and the node depend on these traits rather than on each other, which
//! keeps the servicer/requestor/relay graph acyclic; implementations are
//! injected at wiring time.

/// Block height, hashes, times and historical state of the host chain.
pub mod chain;
/// Re-exports all core error types from the central `viper-types` crate.
pub mod error;
/// Outbound forwarding of relay payloads to hosted chains.
pub mod forwarder;
/// The account/coin ledger the staking modules move tokens through.
pub mod ledger;
/// Hooks that run at the end of every block.
pub mod lifecycle;
/// Read-only views over the staking modules and session cache invalidation.
pub mod staking;
/// Key-value state access.
pub mod state;
/// Transaction context and broadcasting.
pub mod transaction;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::chain::ChainView;
    pub use crate::forwarder::{HostedChain, RelayForwarder};
    pub use crate::ledger::{Ledger, LedgerError, Pool};
    pub use crate::lifecycle::OnEndBlock;
    pub use crate::staking::{RequestorView, SessionCacheInvalidator, StakingView};
    pub use crate::state::{StateAccess, StateScanIter};
    pub use crate::transaction::{BroadcastError, TxBroadcaster, TxContext};
}
