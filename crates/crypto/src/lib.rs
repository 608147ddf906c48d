// Path: crates/crypto/src/lib.rs
//! # Viper Crypto Crate Lints
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
//! # Viper Cryptography
//!
//! Ed25519 keys and signatures, the canonical hash, AAT issuance and
//! validation, and signing helpers for every signed wire object.

pub mod aat;
pub mod algorithms;
pub mod error;
pub mod key_store;
pub mod sign;
pub mod signing;
