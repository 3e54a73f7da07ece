//! Seeded randomness: the process-wide seed and per-worker stream derivation.
//!
//! A [`RandomSource`] is just a seed. Stochastic operations never share a mutable
//! generator; each work unit (a Monte Carlo run, a stationary chain) asks for
//! `source.stream(unit_index)` and owns the returned [`SmallRng`]. Stream seeds are
//! mixed with SplitMix64, so streams for neighbouring indices are decorrelated and
//! results depend only on (seed, unit index), never on the worker thread count.
//!
//! The process-wide source is seeded from entropy on first use and replaced by
//! [`set_global_seed`]. It is read as a snapshot ([`global_source`]) before any
//! stream is derived, so reseeding never races with derivation.

use std::sync::{LazyLock, RwLock};

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::SPLITMIX_GAMMA;

/// SplitMix64 PRNG with a single u64 state word.
///
/// Used here as a seed mixer: one call turns a structured (seed, index) pair into
/// a well-distributed 64-bit seed for a [`SmallRng`].
#[derive(Clone, Debug)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    #[inline(always)]
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline(always)]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(SPLITMIX_GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }
}

/// Seed of stream `index` under `seed`.
///
/// The SplitMix64 state `seed + index·γ` is distinct for every index (γ is odd) and
/// the output function is a bijection, so distinct indices never collide.
#[inline]
pub fn derive_stream_seed(seed: u64, index: u64) -> u64 {
    SplitMix64::new(seed.wrapping_add(index.wrapping_mul(SPLITMIX_GAMMA))).next_u64()
}

/// Seed holder from which independent deterministic streams are derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomSource {
    seed: u64,
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from the operating system's entropy source.
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
    }

    /// Private generator for work unit `index`.
    pub fn stream(&self, index: u64) -> SmallRng {
        SmallRng::seed_from_u64(derive_stream_seed(self.seed, index))
    }
}

static GLOBAL_SOURCE: LazyLock<RwLock<RandomSource>> =
    LazyLock::new(|| RwLock::new(RandomSource::from_entropy()));

/// Replace the process-wide seed.
pub fn set_global_seed(seed: u64) {
    let mut guard = GLOBAL_SOURCE
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.reseed(seed);
    debug!(seed, "global random seed set");
}

/// Snapshot of the process-wide source.
pub fn global_source() -> RandomSource {
    *GLOBAL_SOURCE
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
