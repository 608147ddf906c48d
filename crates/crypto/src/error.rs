// Path: crates/crypto/src/error.rs
//! Local error types for the `viper-crypto` crate.

// Re-export the canonical error type from the types crate.
pub use viper_types::error::CryptoError;
