//! Strategy-level summaries of a stationary distribution over compositions.

use crate::datastructures::StationaryDistribution;
use crate::error::{EgtError, Result};
use crate::game::Game;
use crate::state_space::StateSpace;

fn check_len(state_space: &StateSpace, stationary: &StationaryDistribution) -> Result<()> {
    if stationary.len() != state_space.size() {
        return Err(EgtError::invalid(
            "stationary",
            format!(
                "has {} entries, state space has {} compositions",
                stationary.len(),
                state_space.size()
            ),
        ));
    }
    Ok(())
}

/// Long-run expected frequency of each strategy: Σ_c π(c)·n_s(c)/Z.
pub fn strategy_distribution(
    state_space: &StateSpace,
    stationary: &StationaryDistribution,
) -> Result<Vec<f64>> {
    check_len(state_space, stationary)?;
    let mut frequencies = vec![0.0; state_space.num_strategies()];
    for (index, p) in stationary.iter().filter(|&(_, p)| p > 0.0) {
        let composition = state_space.composition_of(index)?;
        for (f, x) in frequencies.iter_mut().zip(composition.frequencies()) {
            *f += p * x;
        }
    }
    Ok(frequencies)
}

/// Stationary-weighted payoff of each strategy, conditioned on the strategy being
/// present. A strategy never present under π gets 0.
pub fn expected_payoffs(
    game: &dyn Game,
    state_space: &StateSpace,
    stationary: &StationaryDistribution,
) -> Result<Vec<f64>> {
    check_len(state_space, stationary)?;
    let s = state_space.num_strategies();
    let mut weighted = vec![0.0; s];
    let mut mass = vec![0.0; s];
    for (index, p) in stationary.iter().filter(|&(_, p)| p > 0.0) {
        let composition = state_space.composition_of(index)?;
        for (strategy, payoff) in game.payoffs(&composition)?.into_iter().enumerate() {
            if let Some(payoff) = payoff {
                weighted[strategy] += p * payoff;
                mass[strategy] += p;
            }
        }
    }
    Ok(weighted
        .into_iter()
        .zip(mass)
        .map(|(w, m)| if m > 0.0 { w / m } else { 0.0 })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MatrixGame;

    #[test]
    fn test_uniform_distribution_gives_symmetric_frequencies() {
        let space = StateSpace::new(6, 3).unwrap();
        let uniform = StationaryDistribution::from_weights(vec![1.0; space.size()]).unwrap();
        let freq = strategy_distribution(&space, &uniform).unwrap();
        for f in &freq {
            assert!((f - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_point_mass() {
        let space = StateSpace::new(4, 2).unwrap();
        let mut weights = vec![0.0; space.size()];
        // Index 1 is (1, 3).
        weights[1] = 1.0;
        let pi = StationaryDistribution::from_weights(weights).unwrap();
        assert_eq!(strategy_distribution(&space, &pi).unwrap(), vec![0.25, 0.75]);

        let game = MatrixGame::donation(2.0, 1.0).unwrap();
        let payoffs = expected_payoffs(&game, &space, &pi).unwrap();
        // Lone cooperator meets 3 defectors; a defector meets the cooperator once in 3.
        assert!((payoffs[0] + 1.0).abs() < 1e-12);
        assert!((payoffs[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch() {
        let space = StateSpace::new(4, 2).unwrap();
        let pi = StationaryDistribution::from_weights(vec![1.0; 3]).unwrap();
        assert!(strategy_distribution(&space, &pi).is_err());
    }
}
