//! Pairwise fixation and the small-mutation-limit reduction.
//!
//! As μ → 0 the population is almost always monomorphic; a mutant either fixes or
//! goes extinct before the next one appears. The dynamics collapse to an S-state
//! chain over monomorphic populations:
//!
//! ```text
//! T[r][i] = ρ(i → r) / (S − 1)     i ≠ r
//! T[r][r] = 1 − Σ_{i≠r} T[r][i]
//! ```
//!
//! Under strong enough selection every ρ(i → r) into some residents underflows to
//! 0. A single such resident absorbs all mass; two or more leave the embedded
//! chain without a unique stationary distribution, reported as InvalidParameter on
//! the selection intensity.

use serde::Serialize;
use tracing::info;

use crate::cancel::CancelToken;
use crate::datastructures::{CsrMatrix, StationaryDistribution};
use crate::error::{EgtError, Result};
use crate::par::try_map_range;
use crate::transition::TransitionModel;

use super::MarkovAnalyzer;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SmallMutationLimit {
    /// `fixation[i][r]`: probability that one i-mutant takes over an r-population.
    /// The diagonal is 0.
    pub fixation: Vec<Vec<f64>>,
    /// `transition[r][i]`: probability that the monomorphic r-population becomes
    /// the monomorphic i-population.
    pub transition: Vec<Vec<f64>>,
    /// Long-run fraction of time spent in each monomorphic population.
    pub stationary: Vec<f64>,
}

impl MarkovAnalyzer {
    /// `[invader][resident]` fixation probabilities; 0 on the diagonal.
    pub fn fixation_matrix(&self, model: &TransitionModel<'_>) -> Result<Vec<Vec<f64>>> {
        let s = model.state_space().num_strategies();
        let flat = try_map_range(s * s, |pair| {
            let (invader, resident) = (pair / s, pair % s);
            if invader == resident {
                Ok(0.0)
            } else {
                self.fixation_probability(model, invader, resident)
            }
        })?;
        Ok(flat.chunks(s).map(<[f64]>::to_vec).collect())
    }

    pub fn small_mutation_limit(
        &self,
        model: &TransitionModel<'_>,
        cancel: &CancelToken,
    ) -> Result<SmallMutationLimit> {
        let s = model.state_space().num_strategies();
        let fixation = self.fixation_matrix(model)?;
        cancel.check()?;

        let mut transition = vec![vec![0.0; s]; s];
        for (r, row) in transition.iter_mut().enumerate() {
            let mut leaving = 0.0;
            for (i, cell) in row.iter_mut().enumerate().filter(|&(i, _)| i != r) {
                *cell = fixation[i][r] / (s - 1) as f64;
                leaving += *cell;
            }
            row[r] = (1.0 - leaving).max(0.0);
        }

        let absorbing: Vec<usize> = (0..s)
            .filter(|&r| transition[r].iter().enumerate().all(|(i, &t)| i == r || t == 0.0))
            .collect();
        if absorbing.len() > 1 {
            return Err(EgtError::invalid(
                "selection_intensity",
                format!(
                    "{} is too strong: no mutant can take over residents {absorbing:?}, so the \
                     rare-mutation chain has no unique stationary distribution",
                    model.selection_intensity()
                ),
            ));
        }

        let stationary: Vec<f64> = if let [sink] = absorbing[..] {
            (0..s).map(|r| if r == sink { 1.0 } else { 0.0 }).collect()
        } else {
            let csr = CsrMatrix::from_rows(
                s,
                transition
                    .iter()
                    .map(|row| row.iter().copied().enumerate().collect())
                    .collect(),
            )?;
            let weights = self.solve(&csr, cancel)?;
            StationaryDistribution::from_weights(weights)?
                .iter()
                .map(|(_, p)| p)
                .collect()
        };
        info!(strategies = s, "small-mutation-limit chain solved");

        Ok(SmallMutationLimit {
            fixation,
            transition,
            stationary,
        })
    }
}
