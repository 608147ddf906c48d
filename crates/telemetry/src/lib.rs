// Path: crates/telemetry/src/lib.rs
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

//! # Viper Telemetry
//!
//! Structured logging initialization, the Prometheus collectors behind the
//! relay, evidence, worker and fisherman sinks, and a small HTTP server that
//! exposes them.

/// A lightweight HTTP server for exposing `/metrics` and `/healthz`.
pub mod http;
/// The initialization routine for global structured logging.
pub mod init;
/// The concrete implementation of metrics sinks using the `prometheus` crate.
pub mod prometheus;
/// Abstract traits (`*MetricsSink`) that define the contract for metrics reporting.
pub mod sinks;
/// A simple RAII timer for measuring the duration of a scope.
pub mod time;

pub use sinks::{
    error_metrics, evidence_metrics, fisherman_metrics, relay_metrics, worker_metrics,
};
