// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns the configured error metrics sink, or a no-op sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    match SINK.get().copied() {
        Some(sink) => sink.as_error(),
        None => &NOP_SINK,
    }
}

/// Returns the configured relay metrics sink, or a no-op sink.
pub fn relay_metrics() -> &'static dyn RelayMetricsSink {
    match SINK.get().copied() {
        Some(sink) => sink.as_relay(),
        None => &NOP_SINK,
    }
}

/// Returns the configured evidence metrics sink, or a no-op sink.
pub fn evidence_metrics() -> &'static dyn EvidenceMetricsSink {
    match SINK.get().copied() {
        Some(sink) => sink.as_evidence(),
        None => &NOP_SINK,
    }
}

/// Returns the configured worker metrics sink, or a no-op sink.
pub fn worker_metrics() -> &'static dyn WorkerMetricsSink {
    match SINK.get().copied() {
        Some(sink) => sink.as_worker(),
        None => &NOP_SINK,
    }
}

/// Returns the configured fisherman metrics sink, or a no-op sink.
pub fn fisherman_metrics() -> &'static dyn FishermanMetricsSink {
    match SINK.get().copied() {
        Some(sink) => sink.as_fisherman(),
        None => &NOP_SINK,
    }
}

// --- Trait Definitions ---

/// A sink for relay handling.
pub trait RelayMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of relays served, labeled by chain.
    fn inc_relays_served(&self, chain: &str);
    /// Increments the per-chain relay error counter, labeled by error code.
    fn inc_relay_error(&self, chain: &str, code: &'static str);
    /// Observes the end-to-end latency of a served relay.
    fn observe_relay_duration(&self, chain: &str, duration_secs: f64);
    /// Counts session cache lookups by outcome.
    fn inc_session_cache(&self, hit: bool);
}
impl RelayMetricsSink for NopSink {
    fn inc_relays_served(&self, _chain: &str) {}
    fn inc_relay_error(&self, _chain: &str, _code: &'static str) {}
    fn observe_relay_duration(&self, _chain: &str, _duration_secs: f64) {}
    fn inc_session_cache(&self, _hit: bool) {}
}

/// A sink for the local evidence store.
pub trait EvidenceMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of appended proofs, labeled by evidence kind.
    fn inc_proofs_appended(&self, kind: &'static str);
    /// Increments the counter of rejected duplicate proofs.
    fn inc_duplicates_rejected(&self, kind: &'static str);
    /// Counts bloom hits that the linear scan proved false.
    fn inc_bloom_false_positives(&self);
    /// Sets the gauge of evidence sets held in memory.
    fn set_open_evidence(&self, count: u64);
    /// Increments the counter of evidence records written to disk.
    fn inc_records_flushed(&self, count: u64);
}
impl EvidenceMetricsSink for NopSink {
    fn inc_proofs_appended(&self, _kind: &'static str) {}
    fn inc_duplicates_rejected(&self, _kind: &'static str) {}
    fn inc_bloom_false_positives(&self) {}
    fn set_open_evidence(&self, _count: u64) {}
    fn inc_records_flushed(&self, _count: u64) {}
}

/// A sink for the end-of-session worker.
pub trait WorkerMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of claims broadcast.
    fn inc_claims_submitted(&self);
    /// Increments the counter of proofs broadcast.
    fn inc_proofs_submitted(&self);
    /// Increments the counter of evidence sets discarded, labeled by reason.
    fn inc_evidence_discarded(&self, reason: &'static str);
    /// Increments the counter of broadcast failures, labeled by reason.
    fn inc_broadcast_failures(&self, reason: &'static str);
}
impl WorkerMetricsSink for NopSink {
    fn inc_claims_submitted(&self) {}
    fn inc_proofs_submitted(&self) {}
    fn inc_evidence_discarded(&self, _reason: &'static str) {}
    fn inc_broadcast_failures(&self, _reason: &'static str) {}
}

/// A sink for the fisherman.
pub trait FishermanMetricsSink: Send + Sync + std::fmt::Debug {
    /// Counts a sample relay, labeled `ok` or `missed`.
    fn inc_samples(&self, outcome: &'static str);
    /// Observes the round-trip latency of a sample relay.
    fn observe_sample_latency(&self, duration_secs: f64);
    /// Increments the counter of report cards broadcast.
    fn inc_reports_submitted(&self);
}
impl FishermanMetricsSink for NopSink {
    fn inc_samples(&self, _outcome: &'static str) {}
    fn observe_sample_latency(&self, _duration_secs: f64) {}
    fn inc_reports_submitted(&self) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind and variant.
    fn inc_error(&self, kind: &'static str, variant: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _variant: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink:
    RelayMetricsSink + EvidenceMetricsSink + WorkerMetricsSink + FishermanMetricsSink + ErrorMetricsSink
{
    /// This sink as a relay sink.
    fn as_relay(&self) -> &dyn RelayMetricsSink;
    /// This sink as an evidence sink.
    fn as_evidence(&self) -> &dyn EvidenceMetricsSink;
    /// This sink as a worker sink.
    fn as_worker(&self) -> &dyn WorkerMetricsSink;
    /// This sink as a fisherman sink.
    fn as_fisherman(&self) -> &dyn FishermanMetricsSink;
    /// This sink as an error sink.
    fn as_error(&self) -> &dyn ErrorMetricsSink;
}

// Blanket implementation to allow any type that implements all sub-traits
// to be used as a `MetricsSink`.
impl<T> MetricsSink for T
where
    T: RelayMetricsSink
        + EvidenceMetricsSink
        + WorkerMetricsSink
        + FishermanMetricsSink
        + ErrorMetricsSink,
{
    fn as_relay(&self) -> &dyn RelayMetricsSink {
        self
    }
    fn as_evidence(&self) -> &dyn EvidenceMetricsSink {
        self
    }
    fn as_worker(&self) -> &dyn WorkerMetricsSink {
        self
    }
    fn as_fisherman(&self) -> &dyn FishermanMetricsSink {
        self
    }
    fn as_error(&self) -> &dyn ErrorMetricsSink {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_fall_back_to_nop() {
        // Nothing installs a sink in this crate's unit tests.
        relay_metrics().inc_relays_served("0001");
        evidence_metrics().set_open_evidence(3);
        worker_metrics().inc_evidence_discarded("stale");
        fisherman_metrics().inc_samples("ok");
        error_metrics().inc_error("viper", "VIPER_REPLAY_ATTACK");
    }
}
