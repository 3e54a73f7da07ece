//! Population compositions and their dense indexing.
//!
//! A [`Composition`] is a vector of S per-strategy counts summing to Z. The
//! [`StateSpace`] for (Z, S) enumerates all K = C(Z+S−1, S−1) of them in ascending
//! lexicographic order and maps each to an index in [0, K):
//!
//! ```text
//! Z=2, S=3:  0:(0,0,2) 1:(0,1,1) 2:(0,2,0) 3:(1,0,1) 4:(1,1,0) 5:(2,0,0)
//! ```
//!
//! ## Ranking
//!
//! With W(r, p) = C(r+p−1, p−1) compositions of r into p parts, the rank of c is
//! the number of compositions that are lexicographically smaller:
//!
//! ```text
//! index(c) = Σ_{i<S−1} Σ_{v<c_i} W(r_i − v, S−i−1)
//!          = Σ_{i<S−1} [ W(r_i, S−i) − W(r_i − c_i, S−i) ]      (hockey stick)
//! ```
//!
//! where r_i is the mass remaining before position i. Unranking inverts each term
//! with a binary search over c_i. Both are O(S · log Z) binomial evaluations.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::distributions::{binomial, sample_simplex, stars_bars};
use crate::error::{EgtError, Result};

/// Per-strategy counts of a finite population.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Composition {
    counts: Vec<u32>,
}

impl Composition {
    /// Fails with InvalidParameter for an empty vector or an empty population.
    pub fn new(counts: Vec<u32>) -> Result<Self> {
        if counts.is_empty() {
            return Err(EgtError::invalid("composition", "needs at least one strategy"));
        }
        let total: u64 = counts.iter().map(|&c| c as u64).sum();
        if total == 0 {
            return Err(EgtError::invalid("composition", "population is empty"));
        }
        if total > u32::MAX as u64 {
            return Err(EgtError::invalid("composition", "population exceeds u32 range"));
        }
        Ok(Self { counts })
    }

    /// Every individual plays `strategy`.
    pub fn monomorphic(num_strategies: usize, population_size: u32, strategy: usize) -> Result<Self> {
        if strategy >= num_strategies {
            return Err(EgtError::invalid(
                "strategy",
                format!("{strategy} out of range for {num_strategies} strategies"),
            ));
        }
        let mut counts = vec![0; num_strategies];
        counts[strategy] = population_size;
        Self::new(counts)
    }

    /// `invaders` of one strategy among residents of another; every other count is 0.
    pub fn edge(
        num_strategies: usize,
        population_size: u32,
        invader: usize,
        resident: usize,
        invaders: u32,
    ) -> Result<Self> {
        if invader >= num_strategies || resident >= num_strategies || invader == resident {
            return Err(EgtError::invalid(
                "strategy",
                format!("invalid pair ({invader}, {resident}) for {num_strategies} strategies"),
            ));
        }
        if invaders > population_size {
            return Err(EgtError::invalid(
                "invaders",
                format!("{invaders} exceeds population {population_size}"),
            ));
        }
        let mut counts = vec![0; num_strategies];
        counts[invader] = invaders;
        counts[resident] = population_size - invaders;
        Self::new(counts)
    }

    pub(crate) fn from_counts_unchecked(counts: Vec<u32>) -> Self {
        debug_assert!(!counts.is_empty());
        Self { counts }
    }

    #[inline]
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Count of `strategy`, 0 when out of range.
    #[inline]
    pub fn count(&self, strategy: usize) -> u32 {
        self.counts.get(strategy).copied().unwrap_or(0)
    }

    #[inline]
    pub fn num_strategies(&self) -> usize {
        self.counts.len()
    }

    pub fn population_size(&self) -> u32 {
        self.counts.iter().sum()
    }

    #[inline]
    pub fn is_present(&self, strategy: usize) -> bool {
        self.count(strategy) > 0
    }

    /// Strategies with non-zero count, in id order.
    pub fn present_strategies(&self) -> impl Iterator<Item = usize> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(s, _)| s)
    }

    /// The single strategy present, if the population is monomorphic.
    pub fn monomorphic_strategy(&self) -> Option<usize> {
        let mut present = self.present_strategies();
        match (present.next(), present.next()) {
            (Some(s), None) => Some(s),
            _ => None,
        }
    }

    pub fn frequencies(&self) -> Vec<f64> {
        let total = self.population_size() as f64;
        self.counts.iter().map(|&c| c as f64 / total).collect()
    }

    /// One `from`-player switched to `to`. Caller guarantees `count(from) > 0`.
    pub(crate) fn shifted(&self, from: usize, to: usize) -> Composition {
        debug_assert!(self.counts[from] > 0);
        let mut counts = self.counts.clone();
        counts[from] -= 1;
        counts[to] += 1;
        Composition { counts }
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.counts.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ")")
    }
}

/// All compositions of Z individuals over S strategies, with a dense index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSpace {
    population_size: u32,
    num_strategies: usize,
    size: usize,
}

impl StateSpace {
    /// Fails with InvalidParameter when Z < 1, S < 1, or K does not fit in `usize`.
    pub fn new(population_size: usize, num_strategies: usize) -> Result<Self> {
        if population_size < 1 {
            return Err(EgtError::invalid("population_size", "must be at least 1"));
        }
        if num_strategies < 1 {
            return Err(EgtError::invalid("num_strategies", "must be at least 1"));
        }
        let z = u32::try_from(population_size)
            .map_err(|_| EgtError::invalid("population_size", "exceeds u32 range"))?;
        let size = stars_bars(z as u64, num_strategies as u64)
            .and_then(|k| usize::try_from(k).ok())
            .ok_or_else(|| {
                EgtError::invalid(
                    "num_strategies",
                    format!("C({}+{}-1, {}-1) overflows the index type", z, num_strategies, num_strategies),
                )
            })?;
        Ok(Self {
            population_size: z,
            num_strategies,
            size,
        })
    }

    /// K, the number of compositions.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn population_size(&self) -> u32 {
        self.population_size
    }

    #[inline]
    pub fn num_strategies(&self) -> usize {
        self.num_strategies
    }

    /// Compositions of `remaining` into `parts` parts. Never overflows: every value
    /// queried is bounded by K, which fits in `usize`.
    #[inline]
    fn ways(remaining: u32, parts: usize) -> usize {
        if parts == 0 {
            return usize::from(remaining == 0);
        }
        binomial(remaining as u64 + parts as u64 - 1, parts as u64 - 1).unwrap_or(0) as usize
    }

    fn check(&self, composition: &Composition) -> Result<()> {
        if composition.num_strategies() != self.num_strategies {
            return Err(EgtError::invalid(
                "composition",
                format!(
                    "has {} strategies, state space has {}",
                    composition.num_strategies(),
                    self.num_strategies
                ),
            ));
        }
        if composition.population_size() != self.population_size {
            return Err(EgtError::invalid(
                "composition",
                format!(
                    "sums to {}, state space population is {}",
                    composition.population_size(),
                    self.population_size
                ),
            ));
        }
        Ok(())
    }

    /// Dense index of `composition`.
    pub fn index_of(&self, composition: &Composition) -> Result<usize> {
        self.check(composition)?;
        Ok(self.rank(composition.counts()))
    }

    fn rank(&self, counts: &[u32]) -> usize {
        let s = self.num_strategies;
        let mut remaining = self.population_size;
        let mut index = 0usize;
        for (i, &c) in counts.iter().enumerate().take(s - 1) {
            let parts = s - i;
            index += Self::ways(remaining, parts) - Self::ways(remaining - c, parts);
            remaining -= c;
        }
        index
    }

    /// Composition at dense `index`.
    pub fn composition_of(&self, index: usize) -> Result<Composition> {
        if index >= self.size {
            return Err(EgtError::invalid(
                "index",
                format!("{index} out of range for {} compositions", self.size),
            ));
        }
        Ok(Composition::from_counts_unchecked(self.unrank(index)))
    }

    fn unrank(&self, mut index: usize) -> Vec<u32> {
        let s = self.num_strategies;
        let mut counts = Vec::with_capacity(s);
        let mut remaining = self.population_size;
        for i in 0..s - 1 {
            let parts = s - i;
            let total = Self::ways(remaining, parts);
            // Largest c with (total − W(remaining − c, parts)) ≤ index.
            let (mut lo, mut hi) = (0u32, remaining);
            while lo < hi {
                let mid = lo + (hi - lo).div_ceil(2);
                if total - Self::ways(remaining - mid, parts) <= index {
                    lo = mid;
                } else {
                    hi = mid - 1;
                }
            }
            index -= total - Self::ways(remaining - lo, parts);
            counts.push(lo);
            remaining -= lo;
        }
        counts.push(remaining);
        counts
    }

    /// Lazy iterator over all compositions in index order. Restartable: each call
    /// starts again from index 0.
    pub fn enumerate(&self) -> Compositions {
        let mut first = vec![0u32; self.num_strategies];
        first[self.num_strategies - 1] = self.population_size;
        Compositions {
            next: Some(first),
            remaining: self.size,
        }
    }

    /// Index of the composition where every individual plays `strategy`.
    pub fn monomorphic_index(&self, strategy: usize) -> Result<usize> {
        let composition =
            Composition::monomorphic(self.num_strategies, self.population_size, strategy)?;
        Ok(self.rank(composition.counts()))
    }

    /// Uniformly random composition.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Composition {
        Composition::from_counts_unchecked(sample_simplex(
            self.population_size,
            self.num_strategies,
            rng,
        ))
    }
}

/// Iterator returned by [`StateSpace::enumerate`].
#[derive(Debug, Clone)]
pub struct Compositions {
    next: Option<Vec<u32>>,
    remaining: usize,
}

impl Iterator for Compositions {
    type Item = Composition;

    fn next(&mut self) -> Option<Composition> {
        let current = self.next.take()?;
        self.remaining -= 1;

        // Lexicographic successor: move one unit onto the rightmost position that has
        // mass to its right, then push all remaining suffix mass to the last position.
        let s = current.len();
        let mut successor = current.clone();
        let mut suffix: u32 = 0;
        for i in (0..s.saturating_sub(1)).rev() {
            suffix += successor[i + 1];
            if suffix > 0 {
                successor[i] += 1;
                for slot in successor.iter_mut().skip(i + 1) {
                    *slot = 0;
                }
                successor[s - 1] = suffix - 1;
                self.next = Some(successor);
                break;
            }
        }

        Some(Composition::from_counts_unchecked(current))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Compositions {}
