//! Single random walk over compositions.

use rand::Rng;
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::state_space::Composition;
use crate::transition::TransitionModel;

/// Compositions visited by one run, starting with the initial one.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Trajectory {
    pub states: Vec<Composition>,
    /// Strategy that took over, when the walk stopped in an absorbing state.
    pub absorbed: Option<usize>,
}

impl Trajectory {
    /// Number of update steps taken.
    pub fn steps(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    pub fn final_state(&self) -> Option<&Composition> {
        self.states.last()
    }
}

/// Walk from `initial` for at most `max_steps` updates.
///
/// With μ = 0 monomorphic compositions are absorbing and the walk stops as soon as
/// it reaches one. Self-loops are recorded as repeated states.
pub fn run_trajectory<R: Rng + ?Sized>(
    model: &TransitionModel<'_>,
    initial: Composition,
    max_steps: usize,
    rng: &mut R,
    cancel: &CancelToken,
) -> Result<Trajectory> {
    model.state_space().index_of(&initial)?;
    let absorbing = model.mutation_rate() == 0.0;

    let mut states = Vec::with_capacity(max_steps.min(1 << 16) + 1);
    let mut current = initial;
    for _ in 0..max_steps {
        if absorbing {
            if let Some(winner) = current.monomorphic_strategy() {
                states.push(current);
                return Ok(Trajectory {
                    states,
                    absorbed: Some(winner),
                });
            }
        }
        cancel.check()?;
        let next = model.sample_transition(&current, rng)?;
        states.push(std::mem::replace(&mut current, next));
    }

    let absorbed = if absorbing {
        current.monomorphic_strategy()
    } else {
        None
    };
    states.push(current);
    Ok(Trajectory { states, absorbed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EgtError;
    use crate::game::MatrixGame;
    use crate::state_space::StateSpace;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_walk_moves_one_individual_per_step() {
        let game = MatrixGame::hawk_dove(2.0, 3.0).unwrap();
        let model = TransitionModel::new(&game, StateSpace::new(10, 2).unwrap(), 0.1, 1.0).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let start = Composition::new(vec![5, 5]).unwrap();
        let t = run_trajectory(&model, start.clone(), 200, &mut rng, &CancelToken::new()).unwrap();
        assert_eq!(t.steps(), 200);
        assert_eq!(t.states[0], start);
        assert_eq!(t.absorbed, None);
        for pair in t.states.windows(2) {
            let moved: u32 = pair[0]
                .counts()
                .iter()
                .zip(pair[1].counts())
                .map(|(a, b)| a.abs_diff(*b))
                .sum();
            assert!(moved == 0 || moved == 2);
        }
    }

    #[test]
    fn test_absorbs_without_mutation() {
        let game = MatrixGame::donation(2.0, 1.0).unwrap();
        let model = TransitionModel::new(&game, StateSpace::new(8, 2).unwrap(), 0.0, 5.0).unwrap();
        let mut rng = SmallRng::seed_from_u64(9);
        let start = Composition::new(vec![4, 4]).unwrap();
        let t = run_trajectory(&model, start, 1_000_000, &mut rng, &CancelToken::new()).unwrap();
        let winner = t.absorbed.unwrap();
        assert_eq!(t.final_state().unwrap().monomorphic_strategy(), Some(winner));
        assert!(t.steps() < 1_000_000);
    }

    #[test]
    fn test_rejects_foreign_composition_and_cancels() {
        let game = MatrixGame::donation(2.0, 1.0).unwrap();
        let model = TransitionModel::new(&game, StateSpace::new(8, 2).unwrap(), 0.1, 1.0).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        let wrong = Composition::new(vec![1, 1]).unwrap();
        assert!(run_trajectory(&model, wrong, 10, &mut rng, &CancelToken::new()).is_err());

        let cancel = CancelToken::new();
        cancel.cancel();
        let start = Composition::new(vec![4, 4]).unwrap();
        assert_eq!(
            run_trajectory(&model, start, 10, &mut rng, &cancel).unwrap_err(),
            EgtError::Cancelled
        );
    }
}
