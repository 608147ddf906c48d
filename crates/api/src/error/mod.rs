// Path: crates/api/src/error/mod.rs
//! Re-exports all core error types from the central `viper-types` crate.

pub use viper_types::error::*;
