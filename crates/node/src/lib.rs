// Path: crates/node/src/lib.rs
#![forbid(unsafe_code)]
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
//! # Viper Node
//!
//! The off-chain half of a servicer: it validates and serves relays, records
//! the signed proofs as evidence, answers dispatch queries, samples other
//! servicers when drawn as a fisherman, and submits claims, proofs and report
//! cards at session boundaries.
//!
//! A [`node::Node`] owns every piece of per-node state. Several nodes may run
//! in one process ("lean" mode); nothing here is global except the metrics
//! registry.

pub mod client;
pub mod context;
pub mod error;
pub mod fisherman;
pub mod forwarder;
pub mod hosted;
pub mod node;
pub mod relay;
pub mod schedule;
pub mod server;
pub mod worker;

pub use context::NodeContext;
pub use error::NodeError;
pub use node::{Node, NodeDeps};
