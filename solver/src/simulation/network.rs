//! Individual-level pairwise-comparison process on a population structure.
//!
//! Compositions no longer capture the state once neighborhoods differ, so this
//! simulator tracks one strategy per individual. Each step:
//!
//! 1. pick a random focal individual;
//! 2. with probability μ it switches to a uniformly random other strategy;
//! 3. otherwise it picks a random neighbor and copies the neighbor's strategy with
//!    probability 1/(1 + exp(β(f_focal − f_neighbor))).
//!
//! f is the average payoff of an individual against its own neighbors.

use std::collections::HashMap;

use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::cancel::CancelToken;
use crate::distributions::softplus;
use crate::error::{EgtError, Result};
use crate::game::{Game, MatrixGame};
use crate::par::try_map_range;
use crate::random::RandomSource;
use crate::state_space::Composition;
use crate::structure::PopulationStructure;

/// Outcome of one network run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NetworkRun {
    pub final_strategies: Vec<usize>,
    /// Visit frequency of each composition seen after burn-in, most frequent first.
    pub composition_frequencies: Vec<(Composition, f64)>,
    /// Time-averaged strategy frequencies after burn-in.
    pub mean_frequencies: Vec<f64>,
}

#[derive(Clone, Debug)]
pub struct NetworkSimulator<'a> {
    game: &'a MatrixGame,
    structure: &'a PopulationStructure,
    mutation_rate: f64,
    selection_intensity: f64,
}

impl<'a> NetworkSimulator<'a> {
    pub fn new(
        game: &'a MatrixGame,
        structure: &'a PopulationStructure,
        mutation_rate: f64,
        selection_intensity: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&mutation_rate) {
            return Err(EgtError::invalid(
                "mutation_rate",
                format!("must lie in [0, 1], got {mutation_rate}"),
            ));
        }
        if !selection_intensity.is_finite() || selection_intensity < 0.0 {
            return Err(EgtError::invalid(
                "selection_intensity",
                format!("must be finite and non-negative, got {selection_intensity}"),
            ));
        }
        if structure.size() < 2 {
            return Err(EgtError::invalid("population_size", "network runs need at least 2 individuals"));
        }
        Ok(Self {
            game,
            structure,
            mutation_rate,
            selection_intensity,
        })
    }

    fn num_strategies(&self) -> usize {
        self.game.num_strategies()
    }

    fn check_assignment(&self, strategies: &[usize]) -> Result<()> {
        if strategies.len() != self.structure.size() {
            return Err(EgtError::invalid(
                "strategies",
                format!(
                    "has {} entries, population has {}",
                    strategies.len(),
                    self.structure.size()
                ),
            ));
        }
        if let Some(&bad) = strategies.iter().find(|&&s| s >= self.num_strategies()) {
            return Err(EgtError::invalid(
                "strategies",
                format!("strategy {bad} out of range for {} strategies", self.num_strategies()),
            ));
        }
        Ok(())
    }

    /// Uniformly random strategy for every individual.
    pub fn random_assignment<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        (0..self.structure.size())
            .map(|_| rng.random_range(0..self.num_strategies()))
            .collect()
    }

    /// Average payoff of `individual` against its neighbors; 0 without neighbors.
    pub fn payoff(&self, strategies: &[usize], individual: usize) -> Result<f64> {
        let neighbors = self.structure.neighbors(individual)?;
        if neighbors.is_empty() {
            return Ok(0.0);
        }
        let own = strategies[individual];
        let total: f64 = neighbors
            .iter()
            .map(|j| self.game.pairwise(own, strategies[j]))
            .sum();
        Ok(total / neighbors.len() as f64)
    }

    /// One update. Returns `(individual, old, new)` when a strategy changed.
    pub fn step<R: Rng + ?Sized>(
        &self,
        strategies: &mut [usize],
        rng: &mut R,
    ) -> Result<Option<(usize, usize, usize)>> {
        let s = self.num_strategies();
        let focal = rng.random_range(0..strategies.len());
        let old = strategies[focal];

        let new = if rng.random::<f64>() < self.mutation_rate {
            if s < 2 {
                return Ok(None);
            }
            // Uniform over the S−1 other strategies.
            let pick = rng.random_range(0..s - 1);
            if pick >= old {
                pick + 1
            } else {
                pick
            }
        } else {
            let Some(model) = self.structure.random_neighbor(focal, rng)? else {
                return Ok(None);
            };
            let candidate = strategies[model];
            if candidate == old {
                return Ok(None);
            }
            let diff = self.payoff(strategies, focal)? - self.payoff(strategies, model)?;
            let imitate = (-softplus(self.selection_intensity * diff)).exp();
            if rng.random::<f64>() >= imitate {
                return Ok(None);
            }
            candidate
        };

        strategies[focal] = new;
        Ok(Some((focal, old, new)))
    }

    pub fn run<R: Rng + ?Sized>(
        &self,
        initial: Vec<usize>,
        num_steps: usize,
        burn_in: usize,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<NetworkRun> {
        self.check_assignment(&initial)?;
        let s = self.num_strategies();
        let mut strategies = initial;
        let mut counts = vec![0u32; s];
        for &st in &strategies {
            counts[st] += 1;
        }

        let mut visits: HashMap<Vec<u32>, u64> = HashMap::new();
        let mut frequency_sums = vec![0.0; s];
        for step in 0..burn_in + num_steps {
            cancel.check()?;
            if let Some((_, old, new)) = self.step(&mut strategies, rng)? {
                counts[old] -= 1;
                counts[new] += 1;
            }
            if step >= burn_in {
                *visits.entry(counts.clone()).or_insert(0) += 1;
                for (sum, &c) in frequency_sums.iter_mut().zip(&counts) {
                    *sum += c as f64;
                }
            }
        }

        let observed = num_steps.max(1) as f64;
        let population = strategies.len() as f64;
        let mut composition_frequencies = visits
            .into_iter()
            .map(|(c, n)| Ok((Composition::new(c)?, n as f64 / observed)))
            .collect::<Result<Vec<_>>>()?;
        composition_frequencies.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let mean_frequencies = if num_steps == 0 {
            counts.iter().map(|&c| c as f64 / population).collect()
        } else {
            frequency_sums.iter().map(|sum| sum / observed / population).collect()
        };

        Ok(NetworkRun {
            final_strategies: strategies,
            composition_frequencies,
            mean_frequencies,
        })
    }

    /// Mean strategy frequencies over `runs` independent runs from random assignments.
    /// Run r uses stream r of `source`.
    pub fn run_many(
        &self,
        runs: usize,
        num_steps: usize,
        burn_in: usize,
        source: &RandomSource,
        cancel: &CancelToken,
    ) -> Result<Vec<f64>> {
        if runs == 0 {
            return Err(EgtError::invalid("runs", "must be at least 1"));
        }
        let results = try_map_range(runs, |r| {
            let mut rng = source.stream(r as u64);
            let initial = self.random_assignment(&mut rng);
            self.run(initial, num_steps, burn_in, &mut rng, cancel)
        })?;

        let mut mean = vec![0.0; self.num_strategies()];
        for run in &results {
            for (m, f) in mean.iter_mut().zip(&run.mean_frequencies) {
                *m += f / runs as f64;
            }
        }
        info!(
            population = self.structure.size(),
            runs,
            steps = num_steps,
            "network runs finished"
        );
        Ok(mean)
    }
}
