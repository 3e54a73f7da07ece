//! Interval estimates for Monte Carlo proportions.

use serde::Serialize;

use crate::constants::Z_95;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

impl ConfidenceInterval {
    /// 95% Wilson score interval for `successes` out of `trials`.
    ///
    /// Unlike the normal approximation it stays inside [0, 1] and has a non-zero
    /// width when every run succeeds or every run fails, which is the common case
    /// for fixation under strong selection.
    pub fn wilson(successes: u64, trials: u64) -> Self {
        if trials == 0 {
            return Self {
                lower: 0.0,
                upper: 1.0,
                level: 0.95,
            };
        }
        let n = trials as f64;
        let p = successes as f64 / n;
        let z2 = Z_95 * Z_95;
        let denom = 1.0 + z2 / n;
        let center = (p + z2 / (2.0 * n)) / denom;
        let half = Z_95 * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;
        Self {
            lower: (center - half).max(0.0),
            upper: (center + half).min(1.0),
            level: 0.95,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Monte Carlo fixation result.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FixationEstimate {
    pub probability: f64,
    pub interval: ConfidenceInterval,
    pub runs: u64,
    pub fixations: u64,
}

impl FixationEstimate {
    pub fn from_counts(fixations: u64, runs: u64) -> Self {
        let probability = if runs == 0 {
            0.0
        } else {
            fixations as f64 / runs as f64
        };
        Self {
            probability,
            interval: ConfidenceInterval::wilson(fixations, runs),
            runs,
            fixations,
        }
    }
}
