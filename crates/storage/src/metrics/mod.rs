// Path: crates/storage/src/metrics/mod.rs
use once_cell::sync::OnceCell;
use viper_telemetry::sinks::{EvidenceMetricsSink, NopSink};

static NOP_SINK: NopSink = NopSink;
/// The evidence sink; left unset in tests and lean setups.
pub static SINK: OnceCell<&'static dyn EvidenceMetricsSink> = OnceCell::new();

/// The installed evidence metrics sink, or a no-op sink.
pub fn metrics() -> &'static dyn EvidenceMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}
