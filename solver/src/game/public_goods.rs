//! N-player public goods game with groups drawn from the population.

use serde::{Deserialize, Serialize};

use crate::distributions::multivariate_hypergeometric_pmf;
use crate::error::{EgtError, Result};
use crate::state_space::Composition;

use super::{check_focal, Game};

pub const DEFECTOR: usize = 0;
pub const COOPERATOR: usize = 1;

/// Cooperators pay `cost`; the pot is multiplied by `multiplier` and split equally
/// among the `group_size` members.
///
/// The focal individual's N−1 group mates are drawn without replacement from the
/// other Z−1 individuals, so the payoff is a hypergeometric average over the number
/// k of cooperating mates:
///
/// ```text
/// payoff_D = Σ_k P(k) · r·c·k / N
/// payoff_C = Σ_k P(k) · r·c·(k+1) / N − c
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicGoodsGame {
    group_size: u32,
    multiplier: f64,
    cost: f64,
}

impl PublicGoodsGame {
    pub fn new(group_size: u32, multiplier: f64, cost: f64) -> Result<Self> {
        if group_size < 2 {
            return Err(EgtError::invalid("group_size", "must be at least 2"));
        }
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(EgtError::invalid(
                "multiplier",
                format!("must be finite and non-negative, got {multiplier}"),
            ));
        }
        if !cost.is_finite() || cost < 0.0 {
            return Err(EgtError::invalid(
                "cost",
                format!("must be finite and non-negative, got {cost}"),
            ));
        }
        Ok(Self {
            group_size,
            multiplier,
            cost,
        })
    }

    pub fn group_size(&self) -> u32 {
        self.group_size
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Payoff to a focal player whose N−1 mates include `cooperating_mates` cooperators.
    pub fn group_payoff(&self, focal: usize, cooperating_mates: u32) -> f64 {
        let n = self.group_size as f64;
        let share = self.multiplier * self.cost / n;
        if focal == COOPERATOR {
            share * (cooperating_mates + 1) as f64 - self.cost
        } else {
            share * cooperating_mates as f64
        }
    }
}

impl Game for PublicGoodsGame {
    fn num_strategies(&self) -> usize {
        2
    }

    fn payoff(&self, composition: &Composition, focal: usize) -> Result<f64> {
        check_focal(2, composition, focal)?;
        let z = composition.population_size();
        if z < self.group_size {
            return Err(EgtError::invalid(
                "population_size",
                format!("{z} is smaller than the group size {}", self.group_size),
            ));
        }

        let mut others = [composition.count(DEFECTOR), composition.count(COOPERATOR)];
        others[focal] -= 1;
        let mates = self.group_size - 1;

        let lowest = mates.saturating_sub(others[DEFECTOR]);
        let highest = mates.min(others[COOPERATOR]);
        let expected = (lowest..=highest)
            .map(|k| {
                let p = multivariate_hypergeometric_pmf(&others, &[mates - k, k]);
                p * self.group_payoff(focal, k)
            })
            .sum();
        Ok(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Closed form: the hypergeometric mean of cooperating mates is (N−1)·c_others/(Z−1).
    fn closed_form(game: &PublicGoodsGame, composition: &Composition, focal: usize) -> f64 {
        let z = composition.population_size() as f64;
        let n = game.group_size() as f64;
        let coop_others = composition.count(COOPERATOR) as f64 - if focal == COOPERATOR { 1.0 } else { 0.0 };
        let mean_k = (n - 1.0) * coop_others / (z - 1.0);
        game.group_payoff(focal, 0) + game.multiplier() * game.cost() / n * mean_k
    }

    #[test]
    fn test_matches_closed_form() {
        let game = PublicGoodsGame::new(5, 3.0, 1.0).unwrap();
        for c in 1..20 {
            let composition = Composition::new(vec![20 - c, c]).unwrap();
            for focal in [DEFECTOR, COOPERATOR] {
                let got = game.payoff(&composition, focal).unwrap();
                let want = closed_form(&game, &composition, focal);
                assert!((got - want).abs() < 1e-10, "c={c} focal={focal}: {got} vs {want}");
            }
        }
    }

    #[test]
    fn test_defectors_earn_more_in_same_population() {
        let game = PublicGoodsGame::new(4, 3.0, 1.0).unwrap();
        let composition = Composition::new(vec![5, 5]).unwrap();
        let d = game.payoff(&composition, DEFECTOR).unwrap();
        let c = game.payoff(&composition, COOPERATOR).unwrap();
        // c − r·c/N + (r·c/N)·(N−1)/(Z−1) = 1 − 0.75 + 0.75·3/9
        assert!((d - c - 0.5).abs() < 1e-12, "d={d} c={c}");
    }

    #[test]
    fn test_whole_population_is_one_group() {
        let game = PublicGoodsGame::new(3, 2.0, 1.0).unwrap();
        let composition = Composition::new(vec![1, 2]).unwrap();
        // Every group is the whole population: 2 contributions · 2 / 3 shared.
        assert!((game.payoff(&composition, DEFECTOR).unwrap() - 4.0 / 3.0).abs() < 1e-12);
        assert!((game.payoff(&composition, COOPERATOR).unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_configurations() {
        assert!(PublicGoodsGame::new(1, 3.0, 1.0).is_err());
        assert!(PublicGoodsGame::new(3, f64::NAN, 1.0).is_err());
        assert!(PublicGoodsGame::new(3, 2.0, -1.0).is_err());

        let game = PublicGoodsGame::new(6, 3.0, 1.0).unwrap();
        let small = Composition::new(vec![2, 2]).unwrap();
        assert!(matches!(
            game.payoff(&small, DEFECTOR),
            Err(EgtError::InvalidParameter { name: "population_size", .. })
        ));
        let all_defect = Composition::new(vec![8, 0]).unwrap();
        assert!(matches!(
            game.payoff(&all_defect, COOPERATOR),
            Err(EgtError::DomainError { .. })
        ));
    }
}
