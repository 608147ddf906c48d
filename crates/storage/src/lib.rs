// Path: crates/storage/src/lib.rs
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

//! Local evidence storage for servicers and fishermen.
//!
//! Each `(session header, evidence kind, servicer)` accumulates proofs in
//! append order behind its own lock. Sets are sealed exactly once, when their
//! Merkle root is computed, and persisted to a single redb table so a restart
//! does not lose claimable work. Evidence is private to the node and is never
//! gossiped.

pub mod bloom;
pub mod evidence;
pub mod metrics;

pub use bloom::BloomFilter;
pub use evidence::{Evidence, EvidenceInfo, EvidenceKey, EvidenceStore};
