//! Repeated two-action game between behaviors.
//!
//! Two behaviors meet for a fixed number of rounds of a 2×2 stage game. Because every
//! [`Behavior`] is memory-one, the joint distribution over the previous action pair
//! is a 4-state Markov chain; pushing it forward round by round gives the exact
//! expected payoff even for stochastic behaviors. The resulting S×S matrix of
//! average per-round payoffs is computed once at construction, after which the game
//! behaves like a [`MatrixGame`].

use rand::Rng;

use crate::behavior::{Action, ActionContext, Behavior};
use crate::error::{EgtError, Result};
use crate::state_space::Composition;

use super::{Game, MatrixGame, PayoffMatrix};

const ACTIONS: [Action; 2] = [Action::Cooperate, Action::Defect];

/// Stage payoffs to the row player, indexed `[own action][opponent action]`
/// with 0 = Cooperate, 1 = Defect.
pub type StagePayoffs = [[f64; 2]; 2];

#[derive(Clone, Debug)]
pub struct NormalFormGame {
    behaviors: Vec<Behavior>,
    rounds: usize,
    stage: StagePayoffs,
    expected: MatrixGame,
}

impl NormalFormGame {
    pub fn new(rounds: usize, stage: StagePayoffs, behaviors: Vec<Behavior>) -> Result<Self> {
        if rounds == 0 {
            return Err(EgtError::invalid("rounds", "must be at least 1"));
        }
        if behaviors.is_empty() {
            return Err(EgtError::invalid("behaviors", "needs at least one behavior"));
        }
        if stage.iter().flatten().any(|v| !v.is_finite()) {
            return Err(EgtError::invalid("stage", "contains a non-finite payoff"));
        }
        for behavior in &behaviors {
            behavior.validate()?;
        }

        let rows = behaviors
            .iter()
            .map(|a| {
                behaviors
                    .iter()
                    .map(|b| expected_round_payoff(a, b, rounds, &stage))
                    .collect()
            })
            .collect();
        let expected = MatrixGame::new(PayoffMatrix::new(rows)?);

        Ok(Self {
            behaviors,
            rounds,
            stage,
            expected,
        })
    }

    /// Stage payoffs from the usual prisoner's dilemma letters.
    pub fn prisoners_dilemma_stage(reward: f64, sucker: f64, temptation: f64, punishment: f64) -> StagePayoffs {
        [[reward, sucker], [temptation, punishment]]
    }

    pub fn behaviors(&self) -> &[Behavior] {
        &self.behaviors
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Average per-round payoff of behavior i against behavior j.
    pub fn payoff_matrix(&self) -> &PayoffMatrix {
        self.expected.payoff_matrix()
    }

    /// Play one sampled match; returns both players' average per-round payoffs.
    pub fn play_match<R: Rng + ?Sized>(&self, first: usize, second: usize, rng: &mut R) -> Result<(f64, f64)> {
        let (a, b) = match (self.behaviors.get(first), self.behaviors.get(second)) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(EgtError::invalid(
                    "strategy",
                    format!("pair ({first}, {second}) out of range for {} behaviors", self.behaviors.len()),
                ))
            }
        };

        let mut ctx_a = ActionContext::default();
        let mut ctx_b = ActionContext::default();
        let (mut total_a, mut total_b) = (0.0, 0.0);
        for _ in 0..self.rounds {
            let act_a = a.act(&ctx_a, rng);
            let act_b = b.act(&ctx_b, rng);
            total_a += self.stage[act_a.index()][act_b.index()];
            total_b += self.stage[act_b.index()][act_a.index()];
            ctx_a = ctx_a.after(act_a, act_b);
            ctx_b = ctx_b.after(act_b, act_a);
        }
        let rounds = self.rounds as f64;
        Ok((total_a / rounds, total_b / rounds))
    }
}

/// Exact average per-round payoff of `a` against `b`.
fn expected_round_payoff(a: &Behavior, b: &Behavior, rounds: usize, stage: &StagePayoffs) -> f64 {
    let first_a = a.first_move();
    let first_b = b.first_move();
    // joint[x][y]: probability that a played ACTIONS[x] and b played ACTIONS[y] this round.
    let mut joint = outer(first_a, first_b);
    let mut total = 0.0;

    for round in 0..rounds {
        for x in 0..2 {
            for y in 0..2 {
                total += joint[x][y] * stage[x][y];
            }
        }
        if round + 1 == rounds {
            break;
        }

        let mut next = [[0.0; 2]; 2];
        for x in 0..2 {
            for y in 0..2 {
                let q = joint[x][y];
                if q == 0.0 {
                    continue;
                }
                let p_a = a.response(ACTIONS[x], ACTIONS[y]);
                let p_b = b.response(ACTIONS[y], ACTIONS[x]);
                let step = outer(p_a, p_b);
                for u in 0..2 {
                    for v in 0..2 {
                        next[u][v] += q * step[u][v];
                    }
                }
            }
        }
        joint = next;
    }

    total / rounds as f64
}

#[inline]
fn outer(p_a: f64, p_b: f64) -> [[f64; 2]; 2] {
    [
        [p_a * p_b, p_a * (1.0 - p_b)],
        [(1.0 - p_a) * p_b, (1.0 - p_a) * (1.0 - p_b)],
    ]
}

impl Game for NormalFormGame {
    fn num_strategies(&self) -> usize {
        self.behaviors.len()
    }

    fn payoff(&self, composition: &Composition, focal: usize) -> Result<f64> {
        self.expected.payoff(composition, focal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const PD: StagePayoffs = [[3.0, 0.0], [5.0, 1.0]];

    #[test]
    fn test_deterministic_matchups() {
        let game = NormalFormGame::new(
            10,
            PD,
            vec![Behavior::Cooperator, Behavior::Defector, Behavior::TitForTat],
        )
        .unwrap();
        let m = game.payoff_matrix();
        assert!((m.get(0, 0) - 3.0).abs() < 1e-12);
        assert!((m.get(0, 1) - 0.0).abs() < 1e-12);
        assert!((m.get(1, 0) - 5.0).abs() < 1e-12);
        // TFT vs ALLD: sucker once, then mutual defection for 9 rounds.
        assert!((m.get(2, 1) - 0.9).abs() < 1e-12);
        // ALLD vs TFT: temptation once, then punishment.
        assert!((m.get(1, 2) - 1.4).abs() < 1e-12);
        assert!((m.get(2, 2) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_wsls_recovers_from_stft() {
        // Both behaviors are deterministic, so one sampled match equals the exact value.
        let game = NormalFormGame::new(
            6,
            PD,
            vec![Behavior::WinStayLoseShift, Behavior::SuspiciousTitForTat],
        )
        .unwrap();
        let mut rng = SmallRng::seed_from_u64(3);
        let (sampled, _) = game.play_match(0, 1, &mut rng).unwrap();
        assert!((game.payoff_matrix().get(0, 1) - sampled).abs() < 1e-12);
    }

    #[test]
    fn test_stochastic_matches_sampling() {
        let game = NormalFormGame::new(
            5,
            PD,
            vec![
                Behavior::GenerousTitForTat { generosity: 0.4 },
                Behavior::Random { p: 0.5 },
            ],
        )
        .unwrap();
        let mut rng = SmallRng::seed_from_u64(11);
        let n = 40_000;
        let mean: f64 = (0..n)
            .map(|_| game.play_match(0, 1, &mut rng).unwrap().0)
            .sum::<f64>()
            / n as f64;
        let exact = game.payoff_matrix().get(0, 1);
        assert!((mean - exact).abs() < 0.03, "sampled={mean} exact={exact}");
    }

    #[test]
    fn test_invalid_construction() {
        assert!(NormalFormGame::new(0, PD, vec![Behavior::Cooperator]).is_err());
        assert!(NormalFormGame::new(3, PD, vec![]).is_err());
        assert!(NormalFormGame::new(3, PD, vec![Behavior::Random { p: -0.1 }]).is_err());
        let game = NormalFormGame::new(3, PD, vec![Behavior::Cooperator]).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        assert!(game.play_match(0, 1, &mut rng).is_err());
    }

    #[test]
    fn test_population_payoff_uses_expected_matrix() {
        let game = NormalFormGame::new(4, PD, vec![Behavior::Cooperator, Behavior::Defector]).unwrap();
        let c = Composition::new(vec![2, 1]).unwrap();
        // Cooperator meets one cooperator and one defector: (3 + 0) / 2.
        assert!((game.payoff(&c, 0).unwrap() - 1.5).abs() < 1e-12);
    }
}
