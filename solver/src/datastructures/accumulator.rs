//! Visit counters for Monte Carlo stationary estimates.
//!
//! Dense counts cost 8 bytes per composition and are used whenever the state space
//! is small enough to enumerate. Beyond that only visited compositions are stored.

use std::collections::HashMap;

use crate::error::Result;

use super::StationaryDistribution;

#[derive(Clone, Debug, PartialEq)]
pub enum VisitCounter {
    Dense(Vec<u64>),
    Sparse(HashMap<usize, u64>),
}

impl VisitCounter {
    /// Dense when `num_states <= dense_limit`, sparse otherwise.
    pub fn for_states(num_states: usize, dense_limit: usize) -> Self {
        if num_states <= dense_limit {
            VisitCounter::Dense(vec![0; num_states])
        } else {
            VisitCounter::Sparse(HashMap::new())
        }
    }

    #[inline]
    pub fn record(&mut self, index: usize) {
        self.add(index, 1);
    }

    #[inline]
    fn add(&mut self, index: usize, visits: u64) {
        match self {
            VisitCounter::Dense(counts) => counts[index] += visits,
            VisitCounter::Sparse(counts) => *counts.entry(index).or_insert(0) += visits,
        }
    }

    pub fn count(&self, index: usize) -> u64 {
        match self {
            VisitCounter::Dense(counts) => counts.get(index).copied().unwrap_or(0),
            VisitCounter::Sparse(counts) => counts.get(&index).copied().unwrap_or(0),
        }
    }

    pub fn total(&self) -> u64 {
        match self {
            VisitCounter::Dense(counts) => counts.iter().sum(),
            VisitCounter::Sparse(counts) => counts.values().sum(),
        }
    }

    /// Add `other`'s counts into `self`.
    pub fn merge(&mut self, other: VisitCounter) {
        match other {
            VisitCounter::Dense(counts) => {
                for (index, visits) in counts.into_iter().enumerate().filter(|&(_, v)| v > 0) {
                    self.add(index, visits);
                }
            }
            VisitCounter::Sparse(counts) => {
                for (index, visits) in counts {
                    self.add(index, visits);
                }
            }
        }
    }

    /// Normalize over `num_states` compositions. Sparse counts stay sparse, so only
    /// visited compositions are ever allocated.
    pub fn into_distribution(self, num_states: usize) -> Result<StationaryDistribution> {
        match self {
            VisitCounter::Dense(counts) => {
                StationaryDistribution::from_weights(counts.into_iter().map(|c| c as f64).collect())
            }
            VisitCounter::Sparse(counts) => StationaryDistribution::from_sparse_weights(
                num_states,
                counts.into_iter().map(|(k, v)| (k, v as f64)),
            ),
        }
    }
}
