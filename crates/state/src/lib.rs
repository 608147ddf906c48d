// Path: crates/state/src/lib.rs
//! # Viper State Crate Lints
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
        clippy::indexing_slicing
    )
)]
//! # Viper State
//!
//! The range Merkle accumulator that commits a servicer's evidence, the
//! pseudorandom draws that select session members and challenged leaves, and
//! an ordered in-memory key-value store implementing `StateAccess`.

pub mod memory;
pub mod merkle;
pub mod random;

/// A prelude for easily importing the most common items.
pub mod prelude {
    pub use crate::memory::MemoryState;
    pub use crate::merkle::{generate_proof, generate_root, path_covers_root, validate_proof};
    pub use crate::random::{prs, pseudorandom_index, session_key};
}
