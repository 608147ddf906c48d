// Path: crates/types/src/app/score.rs
//! A non-negative fixed-point decimal in `[0, 1]` with six fractional digits.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A QoS score stored as millionths.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(transparent)]
pub struct Score(u64);

impl Score {
    /// Units per whole.
    pub const SCALE: u64 = 1_000_000;
    /// The lowest score.
    pub const ZERO: Score = Score(0);
    /// The highest score.
    pub const ONE: Score = Score(Self::SCALE);

    /// Builds a score from millionths, clamped to `[0, 1]`.
    pub fn from_micros(micros: u64) -> Self {
        Score(micros.min(Self::SCALE))
    }

    /// `numerator / denominator`, truncated and clamped; zero when the denominator is zero.
    pub fn from_ratio(numerator: u64, denominator: u64) -> Self {
        if denominator == 0 {
            return Self::ZERO;
        }
        let micros = (numerator as u128 * Self::SCALE as u128) / denominator as u128;
        Score(micros.min(Self::SCALE as u128) as u64)
    }

    /// `1 - self`.
    pub fn complement(&self) -> Self {
        Score(Self::SCALE - self.0)
    }

    /// The raw millionths.
    pub fn micros(&self) -> u64 {
        self.0
    }

    /// Whether the stored value lies in `[0, 1]`; decoded values may not.
    pub fn is_valid(&self) -> bool {
        self.0 <= Self::SCALE
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.0 / Self::SCALE, self.0 % Self::SCALE)
    }
}

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Score({})", self)
    }
}
