//! Numeric tolerances, default limits, and environment variable names.
//!
//! Every default here can be overridden through [`crate::env_config::EngineConfig`].

/// Tolerance for the sum of outgoing transition probabilities of one composition.
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// Tolerance for the total mass of a probability distribution.
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// Default ceiling on the number of compositions K for exact (Markov) analysis.
///
/// Matrix assembly stores at most S·(S−1)+1 entries per row, so the ceiling bounds
/// memory at roughly `K × (S² × 16)` bytes.
pub const DEFAULT_STATE_LIMIT: usize = 2_000_000;

/// Largest K for which the stationary distribution is solved by dense LU.
///
/// Dense LU is O(K³) time and O(K²) memory; above this banded elimination is used
/// instead.
pub const DEFAULT_DENSE_LIMIT: usize = 2_500;

/// Most band entries (8 bytes each) banded elimination may allocate.
///
/// K × (2w + 1) for half-bandwidth w; Z = 300 with S = 3 needs about 27 million.
pub const DEFAULT_BAND_LIMIT: usize = 100_000_000;

/// Number of independent chains averaged by the Monte Carlo stationary estimator.
pub const DEFAULT_STATIONARY_CHAINS: usize = 8;

/// Standard normal quantile for a two-sided 95% interval.
pub const Z_95: f64 = 1.959_963_984_540_054;

/// Golden-ratio increment used by SplitMix64 and stream derivation.
pub const SPLITMIX_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

pub const ENV_STATE_LIMIT: &str = "EGT_STATE_LIMIT";
pub const ENV_DENSE_LIMIT: &str = "EGT_DENSE_LIMIT";
pub const ENV_BAND_LIMIT: &str = "EGT_BAND_LIMIT";
pub const ENV_STATIONARY_CHAINS: &str = "EGT_STATIONARY_CHAINS";
pub const ENV_NUM_THREADS: &str = "RAYON_NUM_THREADS";
