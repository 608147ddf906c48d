// Path: crates/test_utils/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Viper Test Utilities
//!
//! In-memory stand-ins for the host collaborators (ledger, chain view,
//! broadcaster, outbound forwarder) plus deterministic keys and relay builders.

pub mod assertions;
pub mod broadcaster;
pub mod chain;
pub mod forwarder;
pub mod keys;
pub mod ledger;

pub use broadcaster::MockBroadcaster;
pub use chain::MockChain;
pub use forwarder::MockForwarder;
pub use ledger::MemoryLedger;
