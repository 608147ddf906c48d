// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

//! # Viper Types
//!
//! This crate is the foundational library for the Viper relay core, containing
//! the session, relay, evidence, claim and staking data structures, the error
//! enums, the canonical codecs and the node/on-chain parameter objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `viper-types` has minimal dependencies and is itself a
//! dependency for every other crate in the workspace. This prevents circular
//! dependencies and gives a single definition for shared types like
//! `SessionHeader`, `RelayProof`, `Claim` and the `Msg` union.

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::ViperError> = std::result::Result<T, E>;

/// Relay, session, evidence, claim and staking data structures.
pub mod app;
/// The canonical binary codec for state and the canonical JSON codec for signatures.
pub mod codec;
/// Node configuration and on-chain parameter structures.
pub mod config;
/// A unified set of all error types used across the workspace.
pub mod error;
/// The canonical 32-byte hash function.
pub mod hash;
/// Prefixes and builders for every persisted state key.
pub mod keys;
