//! Selection-mutation transition probabilities between compositions.
//!
//! One update step picks an individual of strategy i (probability n_i/Z) who then
//! switches to strategy j ≠ i with probability
//!
//! ```text
//! (1 − μ) · selection(i → j) + μ / (S − 1)
//! ```
//!
//! The selection term depends on the [`UpdateRule`]:
//!
//! | Rule | selection(i → j) |
//! |------|------------------|
//! | PairwiseComparison (Fermi) | n_j/(Z−1) · 1/(1 + exp(β(f_i − f_j))) |
//! | Moran (exponential fitness) | n_j·exp(βf_j) / Σ_k n_k·exp(βf_k) |
//!
//! Both are evaluated in log space (softplus and log-sum-exp) so large β·Δf never
//! overflows. The self-loop carries whatever probability is left, so a row sums to
//! 1 by construction; [`check_row`] catches games whose payoffs break that.
//!
//! ## Edge chain
//!
//! Fixation of an invader I against a resident R only visits the Z+1 compositions
//! with k invaders and Z−k residents. With T⁺(k) the probability of k → k+1 and
//! T⁻(k) of k → k−1, [`TransitionModel::edge_log_ratios`] returns
//! ln T⁻(k) − ln T⁺(k) at μ = 0 for k = 1..Z−1, which is all the fixation
//! recurrence needs.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::ROW_SUM_TOLERANCE;
use crate::distributions::{log_sum_exp, softplus};
use crate::error::{EgtError, Result};
use crate::game::Game;
use crate::state_space::{Composition, StateSpace};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateRule {
    /// Fermi imitation of a random role model.
    #[default]
    PairwiseComparison,
    /// Birth-death with fitness exp(β·payoff).
    Moran,
}

/// One outgoing transition of a composition, by dense index.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TransitionEntry {
    pub from: usize,
    pub to: usize,
    pub probability: f64,
}

/// Payoffs of one composition, ready for selection terms.
struct Selection<'c> {
    counts: &'c [u32],
    fitness: Vec<Option<f64>>,
    /// ln Σ_k n_k·exp(βf_k), only used by the Moran rule.
    log_norm: f64,
}

/// Transition probabilities for a game on a state space under one update rule.
#[derive(Clone)]
pub struct TransitionModel<'g> {
    game: &'g dyn Game,
    state_space: StateSpace,
    mutation_rate: f64,
    selection_intensity: f64,
    rule: UpdateRule,
}

impl fmt::Debug for TransitionModel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionModel")
            .field("state_space", &self.state_space)
            .field("mutation_rate", &self.mutation_rate)
            .field("selection_intensity", &self.selection_intensity)
            .field("rule", &self.rule)
            .finish_non_exhaustive()
    }
}

fn check_mutation_rate(mutation_rate: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&mutation_rate) {
        return Err(EgtError::invalid(
            "mutation_rate",
            format!("must lie in [0, 1], got {mutation_rate}"),
        ));
    }
    Ok(())
}

impl<'g> TransitionModel<'g> {
    /// Pairwise-comparison model. Fails with InvalidParameter unless μ ∈ [0, 1],
    /// β is finite and non-negative, and the game has as many strategies as the
    /// state space.
    pub fn new(
        game: &'g dyn Game,
        state_space: StateSpace,
        mutation_rate: f64,
        selection_intensity: f64,
    ) -> Result<Self> {
        check_mutation_rate(mutation_rate)?;
        if !selection_intensity.is_finite() || selection_intensity < 0.0 {
            return Err(EgtError::invalid(
                "selection_intensity",
                format!("must be finite and non-negative, got {selection_intensity}"),
            ));
        }
        if game.num_strategies() != state_space.num_strategies() {
            return Err(EgtError::invalid(
                "num_strategies",
                format!(
                    "game has {} strategies, state space has {}",
                    game.num_strategies(),
                    state_space.num_strategies()
                ),
            ));
        }
        Ok(Self {
            game,
            state_space,
            mutation_rate,
            selection_intensity,
            rule: UpdateRule::default(),
        })
    }

    pub fn with_rule(mut self, rule: UpdateRule) -> Self {
        self.rule = rule;
        self
    }

    /// Copy of this model with a different mutation rate.
    pub fn with_mutation_rate(&self, mutation_rate: f64) -> Result<Self> {
        check_mutation_rate(mutation_rate)?;
        let mut model = self.clone();
        model.mutation_rate = mutation_rate;
        Ok(model)
    }

    pub fn game(&self) -> &'g dyn Game {
        self.game
    }

    pub fn state_space(&self) -> &StateSpace {
        &self.state_space
    }

    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    pub fn selection_intensity(&self) -> f64 {
        self.selection_intensity
    }

    pub fn rule(&self) -> UpdateRule {
        self.rule
    }

    /// Payoff of every present strategy; `None` for absent ones.
    pub fn fitness(&self, composition: &Composition) -> Result<Vec<Option<f64>>> {
        let fitness = self.game.payoffs(composition)?;
        if let Some(bad) = fitness.iter().flatten().find(|f| !f.is_finite()) {
            return Err(EgtError::InvariantViolation(format!(
                "game returned non-finite payoff {bad} at {composition}"
            )));
        }
        Ok(fitness)
    }

    fn selection<'c>(&self, composition: &'c Composition) -> Result<Selection<'c>> {
        let fitness = self.fitness(composition)?;
        let log_norm = match self.rule {
            UpdateRule::PairwiseComparison => 0.0,
            UpdateRule::Moran => log_sum_exp(
                composition
                    .counts()
                    .iter()
                    .zip(&fitness)
                    .filter_map(|(&n, f)| f.map(|f| (n as f64).ln() + self.selection_intensity * f))
                    .collect::<Vec<f64>>(),
            ),
        };
        Ok(Selection {
            counts: composition.counts(),
            fitness,
            log_norm,
        })
    }

    /// ln of the selection term for an i-player becoming a j-player; −∞ when zero.
    fn log_selection(&self, sel: &Selection<'_>, from: usize, to: usize) -> f64 {
        let z = self.state_space.population_size();
        let (Some(f_from), Some(f_to)) = (sel.fitness[from], sel.fitness[to]) else {
            return f64::NEG_INFINITY;
        };
        if z == 1 {
            return f64::NEG_INFINITY;
        }
        let n_to = sel.counts[to] as f64;
        match self.rule {
            UpdateRule::PairwiseComparison => {
                (n_to / (z - 1) as f64).ln() - softplus(self.selection_intensity * (f_from - f_to))
            }
            UpdateRule::Moran => n_to.ln() + self.selection_intensity * f_to - sel.log_norm,
        }
    }

    fn switch_probability(&self, sel: &Selection<'_>, from: usize, to: usize) -> f64 {
        let n_from = sel.counts[from];
        if n_from == 0 {
            return 0.0;
        }
        let s = self.state_space.num_strategies();
        let mutation = if s > 1 {
            self.mutation_rate / (s - 1) as f64
        } else {
            0.0
        };
        let chosen = n_from as f64 / self.state_space.population_size() as f64;
        let selection = self.log_selection(sel, from, to).exp();
        chosen * ((1.0 - self.mutation_rate) * selection + mutation)
    }

    /// Probability of every single switch i → j (i ≠ j) with non-zero probability.
    pub fn switch_probabilities(&self, composition: &Composition) -> Result<Vec<(usize, usize, f64)>> {
        let sel = self.selection(composition)?;
        let s = self.state_space.num_strategies();
        let mut switches = Vec::with_capacity(s * s.saturating_sub(1));
        for from in composition.present_strategies() {
            for to in (0..s).filter(|&to| to != from) {
                let p = self.switch_probability(&sel, from, to);
                if p > 0.0 {
                    switches.push((from, to, p));
                }
            }
        }
        Ok(switches)
    }

    /// Every outgoing transition of `composition`, self-loop included.
    pub fn transitions(&self, composition: &Composition) -> Result<Vec<TransitionEntry>> {
        let from = self.state_space.index_of(composition)?;
        let switches = self.switch_probabilities(composition)?;
        let mut entries = Vec::with_capacity(switches.len() + 1);
        let mut leaving = 0.0;
        for (i, j, probability) in switches {
            let to = self.state_space.index_of(&composition.shifted(i, j))?;
            leaving += probability;
            entries.push(TransitionEntry {
                from,
                to,
                probability,
            });
        }
        entries.push(TransitionEntry {
            from,
            to: from,
            probability: (1.0 - leaving).max(0.0),
        });
        Ok(entries)
    }

    /// Transitions out of the composition at dense `index`.
    pub fn transitions_from(&self, index: usize) -> Result<Vec<TransitionEntry>> {
        self.transitions(&self.state_space.composition_of(index)?)
    }

    /// Draw the next composition. Returns the input unchanged on a self-loop.
    pub fn sample_transition<R: Rng + ?Sized>(&self, composition: &Composition, rng: &mut R) -> Result<Composition> {
        let switches = self.switch_probabilities(composition)?;
        let mut u: f64 = rng.random();
        for (i, j, p) in switches {
            if u < p {
                return Ok(composition.shifted(i, j));
            }
            u -= p;
        }
        Ok(composition.clone())
    }

    fn check_pair(&self, invader: usize, resident: usize) -> Result<()> {
        let s = self.state_space.num_strategies();
        if invader >= s || resident >= s {
            return Err(EgtError::invalid(
                "strategy",
                format!("pair ({invader}, {resident}) out of range for {s} strategies"),
            ));
        }
        if invader == resident {
            return Err(EgtError::invalid(
                "strategy",
                format!("invader and resident are both {invader}"),
            ));
        }
        Ok(())
    }

    /// (T⁺(k), T⁻(k)) on the invader/resident edge with k invaders.
    fn edge_step(&self, invader: usize, resident: usize, k: u32) -> Result<(f64, f64)> {
        let s = self.state_space.num_strategies();
        let z = self.state_space.population_size();
        let composition = Composition::edge(s, z, invader, resident, k)?;
        let sel = self.selection(&composition)?;
        Ok((
            self.switch_probability(&sel, resident, invader),
            self.switch_probability(&sel, invader, resident),
        ))
    }

    /// ln T⁻(k) − ln T⁺(k) at μ = 0 for k = 1..Z−1.
    ///
    /// Computed from log selection terms directly so ratios stay finite even when
    /// both probabilities underflow.
    pub fn edge_log_ratios(&self, invader: usize, resident: usize) -> Result<Vec<f64>> {
        self.check_pair(invader, resident)?;
        let s = self.state_space.num_strategies();
        let z = self.state_space.population_size();
        (1..z)
            .map(|k| {
                let composition = Composition::edge(s, z, invader, resident, k)?;
                let sel = self.selection(&composition)?;
                let down = (k as f64).ln() + self.log_selection(&sel, invader, resident);
                let up = ((z - k) as f64).ln() + self.log_selection(&sel, resident, invader);
                let ratio = down - up;
                if ratio.is_nan() {
                    return Err(EgtError::InvariantViolation(format!(
                        "edge ratio undefined at {composition}"
                    )));
                }
                Ok(ratio)
            })
            .collect()
    }

    /// T⁺(k) − T⁻(k) for k = 0..=Z on the invader/resident edge, at the configured μ.
    pub fn gradient_of_selection(&self, invader: usize, resident: usize) -> Result<Vec<f64>> {
        self.check_pair(invader, resident)?;
        (0..=self.state_space.population_size())
            .map(|k| {
                let (up, down) = self.edge_step(invader, resident, k)?;
                Ok(up - down)
            })
            .collect()
    }
}

/// Every probability in [0, 1] and the row summing to 1 within [`ROW_SUM_TOLERANCE`].
pub fn check_row(entries: &[TransitionEntry]) -> Result<()> {
    let from = entries.first().map_or(0, |e| e.from);
    if let Some(bad) = entries
        .iter()
        .find(|e| !e.probability.is_finite() || !(0.0..=1.0).contains(&e.probability))
    {
        return Err(EgtError::InvariantViolation(format!(
            "transition {} -> {} has probability {}",
            bad.from, bad.to, bad.probability
        )));
    }
    let total: f64 = entries.iter().map(|e| e.probability).sum();
    if (total - 1.0).abs() > ROW_SUM_TOLERANCE {
        return Err(EgtError::InvariantViolation(format!(
            "outgoing probabilities of state {from} sum to {total}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MatrixGame;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn donation() -> MatrixGame {
        MatrixGame::donation(2.0, 1.0).unwrap()
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let game = donation();
        let space = StateSpace::new(10, 2).unwrap();
        assert!(TransitionModel::new(&game, space.clone(), -0.1, 1.0).is_err());
        assert!(TransitionModel::new(&game, space.clone(), 1.5, 1.0).is_err());
        assert!(TransitionModel::new(&game, space.clone(), 0.1, -1.0).is_err());
        assert!(TransitionModel::new(&game, space.clone(), 0.1, f64::INFINITY).is_err());
        let wide = StateSpace::new(10, 3).unwrap();
        assert!(matches!(
            TransitionModel::new(&game, wide, 0.1, 1.0),
            Err(EgtError::InvalidParameter { name: "num_strategies", .. })
        ));
        let model = TransitionModel::new(&game, space, 0.0, 1.0).unwrap();
        assert!(model.with_mutation_rate(2.0).is_err());
        assert_eq!(model.with_mutation_rate(0.3).unwrap().mutation_rate(), 0.3);
    }

    #[test]
    fn test_fermi_matches_formula() {
        let game = donation();
        let space = StateSpace::new(10, 2).unwrap();
        let (mu, beta) = (0.05, 0.7);
        let model = TransitionModel::new(&game, space, mu, beta).unwrap();
        let c = Composition::new(vec![4, 6]).unwrap();
        let f_c = game.payoff(&c, 0).unwrap();
        let f_d = game.payoff(&c, 1).unwrap();

        let switches = model.switch_probabilities(&c).unwrap();
        let c_to_d = switches.iter().find(|s| s.0 == 0).unwrap().2;
        let expected = 0.4 * ((1.0 - mu) * 6.0 / 9.0 / (1.0 + (beta * (f_c - f_d)).exp()) + mu);
        assert!((c_to_d - expected).abs() < 1e-14, "{c_to_d} vs {expected}");
    }

    #[test]
    fn test_moran_matches_formula() {
        let game = donation();
        let space = StateSpace::new(8, 2).unwrap();
        let (mu, beta) = (0.1, 0.5);
        let model = TransitionModel::new(&game, space, mu, beta)
            .unwrap()
            .with_rule(UpdateRule::Moran);
        let c = Composition::new(vec![3, 5]).unwrap();
        let f_c = game.payoff(&c, 0).unwrap();
        let f_d = game.payoff(&c, 1).unwrap();
        let norm = 3.0 * (beta * f_c).exp() + 5.0 * (beta * f_d).exp();

        let switches = model.switch_probabilities(&c).unwrap();
        let d_to_c = switches.iter().find(|s| s.0 == 1).unwrap().2;
        let expected = 5.0 / 8.0 * ((1.0 - mu) * 3.0 * (beta * f_c).exp() / norm + mu);
        assert!((d_to_c - expected).abs() < 1e-14);
    }

    #[test]
    fn test_rows_sum_to_one() {
        let game = MatrixGame::from_rows(vec![
            vec![1.0, 4.0, 0.0],
            vec![2.0, 0.5, 3.0],
            vec![0.0, 1.0, 2.5],
        ])
        .unwrap();
        let space = StateSpace::new(12, 3).unwrap();
        for rule in [UpdateRule::PairwiseComparison, UpdateRule::Moran] {
            let model = TransitionModel::new(&game, space.clone(), 0.02, 3.0)
                .unwrap()
                .with_rule(rule);
            for c in space.enumerate() {
                let row = model.transitions(&c).unwrap();
                assert!(row.len() <= 3 * 2 + 1);
                check_row(&row).unwrap();
            }
        }
    }

    #[test]
    fn test_extreme_selection_is_finite() {
        let game = MatrixGame::from_rows(vec![vec![0.0, 1e6], vec![-1e6, 0.0]]).unwrap();
        let space = StateSpace::new(5, 2).unwrap();
        let model = TransitionModel::new(&game, space.clone(), 0.0, 50.0).unwrap();
        for c in space.enumerate() {
            check_row(&model.transitions(&c).unwrap()).unwrap();
        }
        let ratios = model.edge_log_ratios(0, 1).unwrap();
        assert!(ratios.iter().all(|r| r.is_finite() && *r < 0.0));
    }

    #[test]
    fn test_monomorphic_without_mutation_is_absorbing() {
        let game = donation();
        let space = StateSpace::new(6, 2).unwrap();
        let model = TransitionModel::new(&game, space, 0.0, 1.0).unwrap();
        let mono = Composition::monomorphic(2, 6, 1).unwrap();
        let row = model.transitions(&mono).unwrap();
        assert_eq!(row.len(), 1);
        assert_eq!(row[0].from, row[0].to);
        assert_eq!(row[0].probability, 1.0);
    }

    #[test]
    fn test_single_strategy_and_single_individual() {
        let game = MatrixGame::from_rows(vec![vec![1.0]]).unwrap();
        let model = TransitionModel::new(&game, StateSpace::new(4, 1).unwrap(), 0.5, 1.0).unwrap();
        let row = model.transitions(&Composition::new(vec![4]).unwrap()).unwrap();
        assert_eq!(row.len(), 1);
        assert_eq!(row[0].probability, 1.0);

        let game = donation();
        let model = TransitionModel::new(&game, StateSpace::new(1, 2).unwrap(), 0.4, 1.0).unwrap();
        let row = model.transitions(&Composition::new(vec![1, 0]).unwrap()).unwrap();
        // Only mutation moves a lone individual.
        assert!((row[0].probability - 0.4).abs() < 1e-15);
        check_row(&row).unwrap();
    }

    #[test]
    fn test_neutral_edge_ratios_are_zero() {
        let game = donation();
        let space = StateSpace::new(15, 2).unwrap();
        let model = TransitionModel::new(&game, space, 0.0, 0.0).unwrap();
        let ratios = model.edge_log_ratios(0, 1).unwrap();
        assert_eq!(ratios.len(), 14);
        assert!(ratios.iter().all(|r| r.abs() < 1e-12));
    }

    #[test]
    fn test_gradient_sign_follows_dominance() {
        let game = donation();
        let space = StateSpace::new(20, 2).unwrap();
        let model = TransitionModel::new(&game, space, 0.0, 1.0).unwrap();
        // Defectors (1) invading cooperators (0) always have positive drift inside the edge.
        let gradient = model.gradient_of_selection(1, 0).unwrap();
        assert_eq!(gradient.len(), 21);
        assert_eq!(gradient[0], 0.0);
        assert_eq!(gradient[20], 0.0);
        assert!(gradient[1..20].iter().all(|&g| g > 0.0));
        assert!(model.gradient_of_selection(1, 1).is_err());
    }

    #[test]
    fn test_sample_transition_frequencies() {
        let game = donation();
        let space = StateSpace::new(10, 2).unwrap();
        let model = TransitionModel::new(&game, space.clone(), 0.1, 1.0).unwrap();
        let c = Composition::new(vec![5, 5]).unwrap();
        let row = model.transitions(&c).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let n = 50_000;
        let mut hits = vec![0usize; space.size()];
        for _ in 0..n {
            let next = model.sample_transition(&c, &mut rng).unwrap();
            hits[space.index_of(&next).unwrap()] += 1;
        }
        for e in row {
            let freq = hits[e.to] as f64 / n as f64;
            assert!((freq - e.probability).abs() < 0.01, "to={} {freq} vs {}", e.to, e.probability);
        }
    }

    #[test]
    fn test_check_row_flags_bad_sums() {
        let row = vec![
            TransitionEntry { from: 0, to: 1, probability: 0.7 },
            TransitionEntry { from: 0, to: 0, probability: 0.2 },
        ];
        assert!(matches!(check_row(&row), Err(EgtError::InvariantViolation(_))));
        let row = vec![TransitionEntry { from: 0, to: 0, probability: f64::NAN }];
        assert!(check_row(&row).is_err());
    }
}
