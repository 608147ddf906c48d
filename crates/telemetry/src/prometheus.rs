// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_histogram, register_histogram_vec, register_int_counter,
    register_int_counter_vec, register_int_gauge, Histogram, HistogramVec, IntCounter,
    IntCounterVec, IntGauge,
};

// --- Metric Statics ---
// Collectors are registered exactly once by `install`; before that every sink
// method is a no-op.

static RELAYS_SERVED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static RELAY_ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static RELAY_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static SESSION_CACHE_LOOKUPS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

static EVIDENCE_PROOFS_APPENDED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static EVIDENCE_DUPLICATES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static EVIDENCE_BLOOM_FALSE_POSITIVES_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static EVIDENCE_OPEN: OnceCell<IntGauge> = OnceCell::new();
static EVIDENCE_RECORDS_FLUSHED_TOTAL: OnceCell<IntCounter> = OnceCell::new();

static WORKER_CLAIMS_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static WORKER_PROOFS_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static WORKER_EVIDENCE_DISCARDED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static WORKER_BROADCAST_FAILURES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

static FISHERMAN_SAMPLES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static FISHERMAN_SAMPLE_LATENCY_SECONDS: OnceCell<Histogram> = OnceCell::new();
static FISHERMAN_REPORTS_TOTAL: OnceCell<IntCounter> = OnceCell::new();

static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

/// The Prometheus-backed sink.
#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

static PROMETHEUS_SINK: PrometheusSink = PrometheusSink;

/// Runs `$body` with the collector bound to `$m` if `install()` has run.
macro_rules! with_metric {
    ($metric:ident, |$m:ident| $body:expr) => {
        if let Some($m) = $metric.get() {
            $body;
        }
    };
}

impl RelayMetricsSink for PrometheusSink {
    fn inc_relays_served(&self, chain: &str) {
        with_metric!(RELAYS_SERVED_TOTAL, |m| m.with_label_values(&[chain]).inc());
    }
    fn inc_relay_error(&self, chain: &str, code: &'static str) {
        with_metric!(RELAY_ERRORS_TOTAL, |m| m
            .with_label_values(&[chain, code])
            .inc());
    }
    fn observe_relay_duration(&self, chain: &str, duration_secs: f64) {
        with_metric!(RELAY_DURATION_SECONDS, |m| m
            .with_label_values(&[chain])
            .observe(duration_secs));
    }
    fn inc_session_cache(&self, hit: bool) {
        let outcome = if hit { "hit" } else { "miss" };
        with_metric!(SESSION_CACHE_LOOKUPS_TOTAL, |m| m
            .with_label_values(&[outcome])
            .inc());
    }
}

impl EvidenceMetricsSink for PrometheusSink {
    fn inc_proofs_appended(&self, kind: &'static str) {
        with_metric!(EVIDENCE_PROOFS_APPENDED_TOTAL, |m| m
            .with_label_values(&[kind])
            .inc());
    }
    fn inc_duplicates_rejected(&self, kind: &'static str) {
        with_metric!(EVIDENCE_DUPLICATES_TOTAL, |m| m
            .with_label_values(&[kind])
            .inc());
    }
    fn inc_bloom_false_positives(&self) {
        with_metric!(EVIDENCE_BLOOM_FALSE_POSITIVES_TOTAL, |m| m.inc());
    }
    fn set_open_evidence(&self, count: u64) {
        with_metric!(EVIDENCE_OPEN, |m| m.set(i64::try_from(count).unwrap_or(i64::MAX)));
    }
    fn inc_records_flushed(&self, count: u64) {
        with_metric!(EVIDENCE_RECORDS_FLUSHED_TOTAL, |m| m.inc_by(count));
    }
}

impl WorkerMetricsSink for PrometheusSink {
    fn inc_claims_submitted(&self) {
        with_metric!(WORKER_CLAIMS_TOTAL, |m| m.inc());
    }
    fn inc_proofs_submitted(&self) {
        with_metric!(WORKER_PROOFS_TOTAL, |m| m.inc());
    }
    fn inc_evidence_discarded(&self, reason: &'static str) {
        with_metric!(WORKER_EVIDENCE_DISCARDED_TOTAL, |m| m
            .with_label_values(&[reason])
            .inc());
    }
    fn inc_broadcast_failures(&self, reason: &'static str) {
        with_metric!(WORKER_BROADCAST_FAILURES_TOTAL, |m| m
            .with_label_values(&[reason])
            .inc());
    }
}

impl FishermanMetricsSink for PrometheusSink {
    fn inc_samples(&self, outcome: &'static str) {
        with_metric!(FISHERMAN_SAMPLES_TOTAL, |m| m
            .with_label_values(&[outcome])
            .inc());
    }
    fn observe_sample_latency(&self, duration_secs: f64) {
        with_metric!(FISHERMAN_SAMPLE_LATENCY_SECONDS, |m| m.observe(duration_secs));
    }
    fn inc_reports_submitted(&self) {
        with_metric!(FISHERMAN_REPORTS_TOTAL, |m| m.inc());
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, variant: &'static str) {
        with_metric!(ERRORS_TOTAL, |m| m.with_label_values(&[kind, variant]).inc());
    }
}

/// Registers every collector with the default registry and returns the sink.
///
/// Safe to call more than once; collectors are only registered the first time.
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    RELAYS_SERVED_TOTAL.get_or_try_init(|| {
        register_int_counter_vec!(
            "viper_relays_served_total",
            "Total relays served, by chain.",
            &["chain"]
        )
    })?;
    RELAY_ERRORS_TOTAL.get_or_try_init(|| {
        register_int_counter_vec!(
            "viper_relay_errors_total",
            "Total relay failures, by chain and error code.",
            &["chain", "code"]
        )
    })?;
    RELAY_DURATION_SECONDS.get_or_try_init(|| {
        register_histogram_vec!(
            "viper_relay_duration_seconds",
            "End-to-end relay handling latency.",
            &["chain"],
            exponential_buckets(0.005, 2.0, 12)?
        )
    })?;
    SESSION_CACHE_LOOKUPS_TOTAL.get_or_try_init(|| {
        register_int_counter_vec!(
            "viper_session_cache_lookups_total",
            "Session cache lookups, by outcome.",
            &["outcome"]
        )
    })?;
    EVIDENCE_PROOFS_APPENDED_TOTAL.get_or_try_init(|| {
        register_int_counter_vec!(
            "viper_evidence_proofs_appended_total",
            "Proofs appended to local evidence, by kind.",
            &["kind"]
        )
    })?;
    EVIDENCE_DUPLICATES_TOTAL.get_or_try_init(|| {
        register_int_counter_vec!(
            "viper_evidence_duplicates_total",
            "Duplicate proofs rejected, by kind.",
            &["kind"]
        )
    })?;
    EVIDENCE_BLOOM_FALSE_POSITIVES_TOTAL.get_or_try_init(|| {
        register_int_counter!(
            "viper_evidence_bloom_false_positives_total",
            "Bloom filter hits that the linear scan did not confirm."
        )
    })?;
    EVIDENCE_OPEN.get_or_try_init(|| {
        register_int_gauge!(
            "viper_evidence_open",
            "Evidence sets currently held in memory."
        )
    })?;
    EVIDENCE_RECORDS_FLUSHED_TOTAL.get_or_try_init(|| {
        register_int_counter!(
            "viper_evidence_records_flushed_total",
            "Evidence records written to the local store."
        )
    })?;
    WORKER_CLAIMS_TOTAL.get_or_try_init(|| {
        register_int_counter!("viper_worker_claims_total", "Claims broadcast by the worker.")
    })?;
    WORKER_PROOFS_TOTAL.get_or_try_init(|| {
        register_int_counter!("viper_worker_proofs_total", "Proofs broadcast by the worker.")
    })?;
    WORKER_EVIDENCE_DISCARDED_TOTAL.get_or_try_init(|| {
        register_int_counter_vec!(
            "viper_worker_evidence_discarded_total",
            "Evidence sets discarded by the worker, by reason.",
            &["reason"]
        )
    })?;
    WORKER_BROADCAST_FAILURES_TOTAL.get_or_try_init(|| {
        register_int_counter_vec!(
            "viper_worker_broadcast_failures_total",
            "Failed claim and proof broadcasts, by reason.",
            &["reason"]
        )
    })?;
    FISHERMAN_SAMPLES_TOTAL.get_or_try_init(|| {
        register_int_counter_vec!(
            "viper_fisherman_samples_total",
            "Sample relays sent by the fisherman, by outcome.",
            &["outcome"]
        )
    })?;
    FISHERMAN_SAMPLE_LATENCY_SECONDS.get_or_try_init(|| {
        register_histogram!(
            "viper_fisherman_sample_latency_seconds",
            "Round-trip latency of fisherman sample relays.",
            exponential_buckets(0.005, 2.0, 12)?
        )
    })?;
    FISHERMAN_REPORTS_TOTAL.get_or_try_init(|| {
        register_int_counter!(
            "viper_fisherman_reports_total",
            "Report cards broadcast by the fisherman."
        )
    })?;
    ERRORS_TOTAL.get_or_try_init(|| {
        register_int_counter_vec!(
            "viper_errors_total",
            "Errors by kind and code.",
            &["kind", "variant"]
        )
    })?;
    Ok(&PROMETHEUS_SINK)
}
