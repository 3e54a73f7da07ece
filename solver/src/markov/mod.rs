//! Exact Markov-chain analysis for state spaces small enough to enumerate.
//!
//! [`MarkovAnalyzer::build_transition_matrix`] assembles the K×K sparse transition
//! matrix row by row (rows in parallel, each validated). The stationary
//! distribution is solved from it; fixation probabilities never need it because the
//! invader/resident edge is a birth-death chain with a closed form.
//!
//! ## Fixation recurrence
//!
//! ```text
//! ρ(I → R) = 1 / Σ_{k=0}^{Z−1} Π_{m=1}^{k} T⁻(m)/T⁺(m)
//!          = exp(−logsumexp_k L_k),   L_k = Σ_{m=1}^{k} ln(T⁻(m)/T⁺(m))
//! ```
//!
//! The log form stays finite for selection strong enough that the products
//! themselves overflow.

mod fixation;
mod solve;
mod summary;

pub use fixation::SmallMutationLimit;
pub use summary::{expected_payoffs, strategy_distribution};

use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::datastructures::{CsrMatrix, StationaryDistribution};
use crate::distributions::log_sum_exp;
use crate::env_config::EngineConfig;
use crate::error::{EgtError, Result};
use crate::par::try_map_range;
use crate::state_space::StateSpace;
use crate::transition::{check_row, TransitionModel};

/// Row-stochastic K×K matrix plus the mutation rate it was built with.
#[derive(Clone, Debug)]
pub struct TransitionMatrix {
    matrix: CsrMatrix,
    state_space: StateSpace,
    mutation_rate: f64,
}

impl TransitionMatrix {
    pub fn csr(&self) -> &CsrMatrix {
        &self.matrix
    }

    pub fn state_space(&self) -> &StateSpace {
        &self.state_space
    }

    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    pub fn size(&self) -> usize {
        self.matrix.n_rows()
    }

    /// Probability of moving from index `from` to index `to` in one step.
    pub fn probability(&self, from: usize, to: usize) -> f64 {
        self.matrix.get(from, to)
    }
}

#[derive(Clone, Debug, Default)]
pub struct MarkovAnalyzer {
    config: EngineConfig,
}

impl MarkovAnalyzer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// SizeLimitExceeded when K exceeds the configured ceiling (K equal to it is fine).
    pub fn check_size(&self, state_space: &StateSpace) -> Result<()> {
        let states = state_space.size();
        if states > self.config.state_limit {
            return Err(EgtError::SizeLimitExceeded {
                states,
                limit: self.config.state_limit,
            });
        }
        Ok(())
    }

    pub fn build_transition_matrix(
        &self,
        model: &TransitionModel<'_>,
        cancel: &CancelToken,
    ) -> Result<TransitionMatrix> {
        let state_space = model.state_space();
        self.check_size(state_space)?;
        let k = state_space.size();

        let rows = try_map_range(k, |index| {
            cancel.check()?;
            let entries = model.transitions_from(index)?;
            check_row(&entries)?;
            Ok(entries
                .into_iter()
                .map(|e| (e.to, e.probability))
                .collect::<Vec<_>>())
        })?;
        cancel.check()?;

        let matrix = CsrMatrix::from_rows(k, rows)?;
        info!(
            states = k,
            nnz = matrix.nnz(),
            mutation_rate = model.mutation_rate(),
            selection_intensity = model.selection_intensity(),
            rule = ?model.rule(),
            "transition matrix assembled"
        );
        Ok(TransitionMatrix {
            matrix,
            state_space: state_space.clone(),
            mutation_rate: model.mutation_rate(),
        })
    }

    /// π with π·M = π and Σπ = 1. Requires μ > 0.
    pub fn stationary_distribution(
        &self,
        matrix: &TransitionMatrix,
        cancel: &CancelToken,
    ) -> Result<StationaryDistribution> {
        if matrix.mutation_rate <= 0.0 {
            return Err(EgtError::NonErgodicChain {
                mutation_rate: matrix.mutation_rate,
            });
        }
        let weights = self.solve(&matrix.matrix, cancel)?;
        StationaryDistribution::from_weights(weights)
    }

    /// Stationary vector of any row-stochastic matrix: dense LU up to the dense
    /// limit when available, banded GTH elimination otherwise.
    pub(crate) fn solve(&self, matrix: &CsrMatrix, cancel: &CancelToken) -> Result<Vec<f64>> {
        let k = matrix.n_rows();
        cancel.check()?;
        if k == 1 {
            return Ok(vec![1.0]);
        }

        #[cfg(feature = "linalg")]
        if k <= self.config.dense_limit {
            debug!(states = k, method = "dense_lu", "solving stationary distribution");
            return solve::dense_lu(matrix);
        }

        debug!(states = k, method = "banded_gth", "solving stationary distribution");
        let weights = solve::banded_gth(matrix, self.config.band_limit, cancel)?;
        info!(states = k, bandwidth = matrix.bandwidth(), "stationary distribution solved");
        Ok(weights)
    }

    /// Exact probability that one `invader` takes over a population of `resident`s,
    /// with mutation switched off.
    pub fn fixation_probability(
        &self,
        model: &TransitionModel<'_>,
        invader: usize,
        resident: usize,
    ) -> Result<f64> {
        let ratios = model.edge_log_ratios(invader, resident)?;
        let mut partial = 0.0;
        let mut terms = Vec::with_capacity(ratios.len() + 1);
        terms.push(0.0);
        for r in ratios {
            partial += r;
            terms.push(partial);
        }
        let rho = (-log_sum_exp(terms)).exp();
        if !(0.0..=1.0 + 1e-12).contains(&rho) {
            return Err(EgtError::InvariantViolation(format!(
                "fixation probability {rho} for {invader} against {resident}"
            )));
        }
        Ok(rho.min(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MatrixGame;
    use crate::state_space::Composition;

    fn analyzer() -> MarkovAnalyzer {
        MarkovAnalyzer::default()
    }

    #[test]
    fn test_matrix_rows_and_sparsity() {
        let game = MatrixGame::from_rows(vec![
            vec![3.0, 0.0, 1.0],
            vec![5.0, 1.0, 0.0],
            vec![2.0, 2.0, 2.0],
        ])
        .unwrap();
        let space = StateSpace::new(8, 3).unwrap();
        let model = TransitionModel::new(&game, space.clone(), 0.05, 1.0).unwrap();
        let m = analyzer().build_transition_matrix(&model, &CancelToken::new()).unwrap();
        assert_eq!(m.size(), space.size());
        for r in 0..m.size() {
            assert!((m.csr().row_sum(r) - 1.0).abs() < 1e-9);
            assert!(m.csr().row(r).0.len() <= 7);
        }
    }

    #[test]
    fn test_size_limit_boundary() {
        let game = MatrixGame::donation(2.0, 1.0).unwrap();
        let space = StateSpace::new(9, 2).unwrap(); // K = 10
        let model = TransitionModel::new(&game, space, 0.1, 1.0).unwrap();
        let at_limit = MarkovAnalyzer::new(EngineConfig::default().with_state_limit(10));
        assert!(at_limit.build_transition_matrix(&model, &CancelToken::new()).is_ok());
        let below = MarkovAnalyzer::new(EngineConfig::default().with_state_limit(9));
        assert_eq!(
            below.build_transition_matrix(&model, &CancelToken::new()).unwrap_err(),
            EgtError::SizeLimitExceeded { states: 10, limit: 9 }
        );
    }

    #[test]
    fn test_non_ergodic_rejected() {
        let game = MatrixGame::donation(2.0, 1.0).unwrap();
        let model = TransitionModel::new(&game, StateSpace::new(5, 2).unwrap(), 0.0, 1.0).unwrap();
        let m = analyzer().build_transition_matrix(&model, &CancelToken::new()).unwrap();
        assert!(matches!(
            analyzer().stationary_distribution(&m, &CancelToken::new()),
            Err(EgtError::NonErgodicChain { .. })
        ));
    }

    #[test]
    fn test_cancelled_build() {
        let game = MatrixGame::donation(2.0, 1.0).unwrap();
        let model = TransitionModel::new(&game, StateSpace::new(30, 2).unwrap(), 0.1, 1.0).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            analyzer().build_transition_matrix(&model, &cancel).unwrap_err(),
            EgtError::Cancelled
        );
    }

    #[test]
    fn test_stationary_is_fixed_point() {
        let game = MatrixGame::hawk_dove(2.0, 3.0).unwrap();
        let space = StateSpace::new(15, 2).unwrap();
        let model = TransitionModel::new(&game, space, 0.01, 2.0).unwrap();
        let a = analyzer();
        let m = a.build_transition_matrix(&model, &CancelToken::new()).unwrap();
        let pi = a.stationary_distribution(&m, &CancelToken::new()).unwrap();
        assert!((pi.sum() - 1.0).abs() < 1e-6);
        let dense = pi.probabilities().unwrap();
        let next = m.csr().transpose().multiply(dense);
        for (p, q) in dense.iter().zip(&next) {
            assert!((p - q).abs() < 1e-10);
        }
    }

    #[test]
    fn test_fixation_neutral_and_single_individual() {
        let game = MatrixGame::donation(2.0, 1.0).unwrap();
        let model = TransitionModel::new(&game, StateSpace::new(25, 2).unwrap(), 0.0, 0.0).unwrap();
        let rho = analyzer().fixation_probability(&model, 0, 1).unwrap();
        assert!((rho - 1.0 / 25.0).abs() < 1e-12);

        let model = TransitionModel::new(&game, StateSpace::new(1, 2).unwrap(), 0.0, 1.0).unwrap();
        assert_eq!(analyzer().fixation_probability(&model, 0, 1).unwrap(), 1.0);
    }

    #[test]
    fn test_fixation_matches_birth_death_closed_form() {
        // Constant-fitness Fermi: T⁻/T⁺ = exp(−βΔ) on every state, so ρ is geometric.
        let game = MatrixGame::from_rows(vec![vec![1.5, 1.5], vec![1.0, 1.0]]).unwrap();
        let z = 12;
        let beta = 0.8;
        let model = TransitionModel::new(&game, StateSpace::new(z, 2).unwrap(), 0.0, beta).unwrap();
        let r = (-beta * 0.5f64).exp();
        let expected = (1.0 - r) / (1.0 - r.powi(z as i32));
        let rho = analyzer().fixation_probability(&model, 0, 1).unwrap();
        assert!((rho - expected).abs() < 1e-12, "{rho} vs {expected}");
    }

    #[test]
    fn test_fixation_rejects_bad_pairs() {
        let game = MatrixGame::donation(2.0, 1.0).unwrap();
        let model = TransitionModel::new(&game, StateSpace::new(5, 2).unwrap(), 0.0, 1.0).unwrap();
        assert!(analyzer().fixation_probability(&model, 1, 1).is_err());
        assert!(analyzer().fixation_probability(&model, 0, 2).is_err());
    }

    #[test]
    fn test_transition_matrix_probability_lookup() {
        let game = MatrixGame::donation(2.0, 1.0).unwrap();
        let space = StateSpace::new(4, 2).unwrap();
        let model = TransitionModel::new(&game, space.clone(), 0.2, 1.0).unwrap();
        let m = analyzer().build_transition_matrix(&model, &CancelToken::new()).unwrap();
        let from = space.index_of(&Composition::new(vec![2, 2]).unwrap()).unwrap();
        let to = space.index_of(&Composition::new(vec![1, 3]).unwrap()).unwrap();
        let entries = model.transitions(&space.composition_of(from).unwrap()).unwrap();
        let expected = entries.iter().find(|e| e.to == to).unwrap().probability;
        assert_eq!(m.probability(from, to), expected);
        assert_eq!(m.mutation_rate(), 0.2);
    }
}
