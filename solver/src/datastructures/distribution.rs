//! Probability vector over composition indices.
//!
//! Exact solves produce a dense vector of length K. Monte Carlo estimates over state
//! spaces too large to enumerate keep only the visited indices.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::constants::DISTRIBUTION_TOLERANCE;
use crate::error::{EgtError, Result};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Storage {
    Dense(Vec<f64>),
    /// Indices not present have probability 0.
    Sparse(BTreeMap<usize, f64>),
}

/// Long-run occupation probability of each composition index. Non-negative, sums to 1.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StationaryDistribution {
    num_states: usize,
    storage: Storage,
}

impl StationaryDistribution {
    /// Normalize non-negative weights. Round-off negatives above −tolerance·Σ|w| are
    /// clamped to 0; anything more negative, non-finite, or an all-zero vector is an
    /// InvariantViolation.
    pub fn from_weights(mut weights: Vec<f64>) -> Result<Self> {
        if weights.is_empty() {
            return Err(EgtError::InvariantViolation("empty distribution".into()));
        }
        if let Some(i) = weights.iter().position(|w| !w.is_finite()) {
            return Err(EgtError::InvariantViolation(format!(
                "non-finite weight {} at index {i}",
                weights[i]
            )));
        }
        let scale: f64 = weights.iter().map(|w| w.abs()).sum();
        if scale == 0.0 {
            return Err(EgtError::InvariantViolation("all weights are zero".into()));
        }
        for (i, w) in weights.iter_mut().enumerate() {
            if *w < 0.0 {
                if *w < -DISTRIBUTION_TOLERANCE * scale {
                    return Err(EgtError::InvariantViolation(format!(
                        "weight {w} at index {i} is significantly negative"
                    )));
                }
                *w = 0.0;
            }
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(EgtError::InvariantViolation("weights sum to zero".into()));
        }
        for w in &mut weights {
            *w /= total;
        }
        Ok(Self {
            num_states: weights.len(),
            storage: Storage::Dense(weights),
        })
    }

    /// Normalize `(index, weight)` pairs over `num_states` compositions without
    /// allocating per composition. Repeated indices are summed.
    pub fn from_sparse_weights(
        num_states: usize,
        weights: impl IntoIterator<Item = (usize, f64)>,
    ) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (index, w) in weights {
            if index >= num_states {
                return Err(EgtError::InvariantViolation(format!(
                    "index {index} outside 0..{num_states}"
                )));
            }
            if !w.is_finite() || w < 0.0 {
                return Err(EgtError::InvariantViolation(format!(
                    "weight {w} at index {index}"
                )));
            }
            if w > 0.0 {
                *entries.entry(index).or_insert(0.0) += w;
            }
        }
        let total: f64 = entries.values().sum();
        if !(total > 0.0 && total.is_finite()) {
            return Err(EgtError::InvariantViolation(format!(
                "sparse weights sum to {total}"
            )));
        }
        for w in entries.values_mut() {
            *w /= total;
        }
        Ok(Self {
            num_states,
            storage: Storage::Sparse(entries),
        })
    }

    /// The full probability vector, or `None` for a sparse estimate.
    pub fn probabilities(&self) -> Option<&[f64]> {
        match &self.storage {
            Storage::Dense(p) => Some(p),
            Storage::Sparse(_) => None,
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self.storage, Storage::Sparse(_))
    }

    /// Stored `(index, probability)` pairs in index order: every index when dense,
    /// the visited ones when sparse.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (usize, f64)> + '_> {
        match &self.storage {
            Storage::Dense(p) => Box::new(p.iter().copied().enumerate()),
            Storage::Sparse(entries) => Box::new(entries.iter().map(|(&i, &p)| (i, p))),
        }
    }

    /// Number of stored entries.
    pub fn support_size(&self) -> usize {
        match &self.storage {
            Storage::Dense(p) => p.len(),
            Storage::Sparse(entries) => entries.len(),
        }
    }

    /// Probability of index `i`, 0 when out of range or unvisited.
    pub fn probability(&self, i: usize) -> f64 {
        match &self.storage {
            Storage::Dense(p) => p.get(i).copied().unwrap_or(0.0),
            Storage::Sparse(entries) => entries.get(&i).copied().unwrap_or(0.0),
        }
    }

    fn stores(&self, i: usize) -> bool {
        match &self.storage {
            Storage::Dense(p) => i < p.len(),
            Storage::Sparse(entries) => entries.contains_key(&i),
        }
    }

    /// Number of compositions K the distribution ranges over.
    pub fn len(&self) -> usize {
        self.num_states
    }

    pub fn is_empty(&self) -> bool {
        self.num_states == 0
    }

    pub fn sum(&self) -> f64 {
        self.iter().map(|(_, p)| p).sum()
    }

    /// Index with the highest probability; the lowest such index on ties.
    pub fn most_likely(&self) -> usize {
        let mut best = (0, f64::NEG_INFINITY);
        for (i, p) in self.iter() {
            if p > best.1 {
                best = (i, p);
            }
        }
        best.0
    }

    /// ½ Σ |p_i − q_i| over the indices either side stores.
    pub fn total_variation(&self, other: &StationaryDistribution) -> f64 {
        let shared: f64 = self.iter().map(|(i, p)| (p - other.probability(i)).abs()).sum();
        let only_other: f64 = other.iter().filter(|&(i, _)| !self.stores(i)).map(|(_, q)| q).sum();
        0.5 * (shared + only_other)
    }
}
