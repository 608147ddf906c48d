// Path: crates/services/src/lib.rs
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
//! # Viper Services
//!
//! The ledger-side keepers of the relay core: requestor and servicer staking,
//! deterministic session assembly with its cache, and the claim/proof keeper
//! that settles relay work. [`router::Router`] dispatches ledger messages to
//! them and runs their end-block hooks.

pub mod claims;
pub mod router;
pub mod session;
pub mod staking;

#[cfg(test)]
mod testing;

/// The types most callers need.
pub mod prelude {
    pub use crate::claims::{max_possible_relays, ClaimsKeeper, ProofOutcome};
    pub use crate::router::Router;
    pub use crate::session::{build_session, effective_session_size, new_session, SessionCache};
    pub use crate::staking::{RequestorKeeper, RequestorStateView, ServicerKeeper, ServicerStateView};
}
