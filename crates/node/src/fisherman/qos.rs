// Path: crates/node/src/fisherman/qos.rs
//! Folding samples into QoS scores.

use viper_types::app::{Payload, Score, TestResult};

/// Decides whether a servicer's answer is correct.
pub trait ReliabilityOracle: Send + Sync {
    /// Whether `response` is an acceptable answer to `request` on `chain`.
    fn judge(&self, chain: &str, request: &Payload, response: &str) -> bool;
}

/// Accepts every signed response.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptSigned;

impl ReliabilityOracle for AcceptSigned {
    fn judge(&self, _chain: &str, _request: &Payload, _response: &str) -> bool {
        true
    }
}

/// The three scores of one servicer over one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QosScores {
    /// `min(1, expected / average latency)` over answered samples.
    pub latency: Score,
    /// `1 - missed / total`.
    pub availability: Score,
    /// Reliable answers over answered samples.
    pub reliability: Score,
    /// Unix milliseconds of the earliest sample.
    pub first_sample_timestamp: u64,
}

/// Scores `samples`; `None` when there are none. A sample is missed when it
/// carries failure notes. Servicers that never answered score zero on
/// latency and reliability.
pub fn fold_samples(samples: &[TestResult], expected_latency_ms: u64) -> Option<QosScores> {
    let first_sample_timestamp = samples.iter().map(|s| s.timestamp).min()?;
    let total = samples.len() as u64;
    let answered: Vec<&TestResult> = samples.iter().filter(|s| s.notes.is_none()).collect();
    let answered_count = answered.len() as u64;

    let latency = if answered_count == 0 {
        Score::ZERO
    } else {
        let sum: u128 = answered.iter().map(|s| u128::from(s.latency_ms)).sum();
        let avg = (sum / u128::from(answered_count)) as u64;
        if avg == 0 {
            Score::ONE
        } else {
            Score::from_ratio(expected_latency_ms, avg)
        }
    };
    let reliable = answered.iter().filter(|s| s.is_reliable).count() as u64;

    Some(QosScores {
        latency,
        availability: Score::from_ratio(answered_count, total),
        reliability: Score::from_ratio(reliable, answered_count),
        first_sample_timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use viper_types::app::Address;

    fn sample(ts: u64, latency_ms: u64, reliable: bool, missed: bool) -> TestResult {
        TestResult {
            servicer_address: Address([7; 20]),
            timestamp: ts,
            latency_ms,
            is_reliable: reliable && !missed,
            notes: missed.then(|| "timed out".to_string()),
        }
    }

    #[test]
    fn empty_has_no_scores() {
        assert_eq!(fold_samples(&[], 1500), None);
    }

    #[test]
    fn fast_and_reliable_scores_one() {
        let samples: Vec<_> = (0..4).map(|i| sample(100 + i, 200, true, false)).collect();
        let scores = fold_samples(&samples, 1500).unwrap();
        assert_eq!(scores.latency, Score::ONE);
        assert_eq!(scores.availability, Score::ONE);
        assert_eq!(scores.reliability, Score::ONE);
        assert_eq!(scores.first_sample_timestamp, 100);
    }

    #[test]
    fn missed_samples_lower_availability_only() {
        let samples = vec![
            sample(5, 3000, true, false),
            sample(3, 1000, false, false),
            sample(9, 0, false, true),
            sample(7, 0, false, true),
        ];
        let scores = fold_samples(&samples, 1000).unwrap();
        assert_eq!(scores.availability, Score::from_ratio(1, 2));
        // Average of answered samples is 2000 ms.
        assert_eq!(scores.latency, Score::from_ratio(1, 2));
        assert_eq!(scores.reliability, Score::from_ratio(1, 2));
        assert_eq!(scores.first_sample_timestamp, 3);
    }

    #[test]
    fn silent_servicer_scores_zero() {
        let samples = vec![sample(1, 0, false, true), sample(2, 0, false, true)];
        let scores = fold_samples(&samples, 1000).unwrap();
        assert_eq!(scores.availability, Score::ZERO);
        assert_eq!(scores.latency, Score::ZERO);
        assert_eq!(scores.reliability, Score::ZERO);
    }
}
