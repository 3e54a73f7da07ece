//! Monte Carlo estimates that never materialize the transition matrix.
//!
//! Every work unit (one fixation run, one stationary chain) draws from its own
//! stream `source.stream(unit)`, and units are collected in index order, so a fixed
//! seed gives bit-identical results on any number of threads.
//!
//! ## Fixation runs
//!
//! With μ = 0 a run from one invader only ever holds the invader and the resident.
//! Self-loops cannot change the outcome, so runs sample the jump chain: at each
//! step one of the non-trivial switches is drawn in proportion to its probability.
//! Under weak selection this skips the bulk of the steps.

use rand::Rng;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::datastructures::{StationaryDistribution, VisitCounter};
use crate::env_config::EngineConfig;
use crate::error::{EgtError, Result};
use crate::par::try_map_range;
use crate::random::RandomSource;
use crate::state_space::Composition;
use crate::transition::TransitionModel;

use super::statistics::FixationEstimate;
use super::trajectory::{run_trajectory, Trajectory};

#[derive(Clone, Debug, Default)]
pub struct MonteCarloSimulator {
    config: EngineConfig,
}

/// True when the jump chain starting at `start` reaches the all-`invader` state.
fn fixates<R: Rng + ?Sized>(
    model: &TransitionModel<'_>,
    start: Composition,
    invader: usize,
    rng: &mut R,
    cancel: &CancelToken,
) -> Result<bool> {
    let mut current = start;
    loop {
        if let Some(winner) = current.monomorphic_strategy() {
            return Ok(winner == invader);
        }
        cancel.check()?;
        let switches = model.switch_probabilities(&current)?;
        let total: f64 = switches.iter().map(|s| s.2).sum();
        if !(total > 0.0) {
            return Err(EgtError::InvariantViolation(format!(
                "fixation run stalled at {current}: no transition has positive probability"
            )));
        }
        let mut u = rng.random::<f64>() * total;
        let mut chosen = switches[switches.len() - 1];
        for s in &switches {
            if u < s.2 {
                chosen = *s;
                break;
            }
            u -= s.2;
        }
        current = current.shifted(chosen.0, chosen.1);
    }
}

impl MonteCarloSimulator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn run_trajectory<R: Rng + ?Sized>(
        &self,
        model: &TransitionModel<'_>,
        initial: Composition,
        max_steps: usize,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<Trajectory> {
        run_trajectory(model, initial, max_steps, rng, cancel)
    }

    /// Fraction of `num_runs` runs in which one `invader` among Z−1 `resident`s takes
    /// over. The model's mutation rate is ignored.
    pub fn estimate_fixation_probability(
        &self,
        model: &TransitionModel<'_>,
        invader: usize,
        resident: usize,
        num_runs: usize,
        source: &RandomSource,
        cancel: &CancelToken,
    ) -> Result<FixationEstimate> {
        if num_runs == 0 {
            return Err(EgtError::invalid("num_runs", "must be at least 1"));
        }
        let space = model.state_space();
        let start = Composition::edge(
            space.num_strategies(),
            space.population_size(),
            invader,
            resident,
            1,
        )?;
        let model = model.with_mutation_rate(0.0)?;

        let outcomes = try_map_range(num_runs, |run| {
            let mut rng = source.stream(run as u64);
            fixates(&model, start.clone(), invader, &mut rng, cancel)
        })?;
        let fixations = outcomes.iter().filter(|&&fixed| fixed).count() as u64;
        let estimate = FixationEstimate::from_counts(fixations, num_runs as u64);
        info!(
            invader,
            resident,
            runs = num_runs,
            fixations,
            probability = estimate.probability,
            lower = estimate.interval.lower,
            upper = estimate.interval.upper,
            "fixation runs finished"
        );
        Ok(estimate)
    }

    /// Visit frequencies of `stationary_chains` independent chains, each started from
    /// a uniformly random composition and run `burn_in` + `num_steps` steps.
    ///
    /// Above the state limit the result is sparse: it holds only visited
    /// compositions, so K may be far larger than memory.
    pub fn estimate_stationary_distribution(
        &self,
        model: &TransitionModel<'_>,
        num_steps: usize,
        burn_in: usize,
        source: &RandomSource,
        cancel: &CancelToken,
    ) -> Result<StationaryDistribution> {
        if model.mutation_rate() <= 0.0 {
            return Err(EgtError::NonErgodicChain {
                mutation_rate: model.mutation_rate(),
            });
        }
        if num_steps == 0 {
            return Err(EgtError::invalid("num_steps", "must be at least 1"));
        }
        let space = model.state_space();
        let k = space.size();
        let chains = self.config.stationary_chains.max(1);

        let counters = try_map_range(chains, |chain| {
            let mut rng = source.stream(chain as u64);
            let mut current = space.sample(&mut rng);
            for _ in 0..burn_in {
                cancel.check()?;
                current = model.sample_transition(&current, &mut rng)?;
            }
            let mut visits = VisitCounter::for_states(k, self.config.state_limit);
            for _ in 0..num_steps {
                cancel.check()?;
                current = model.sample_transition(&current, &mut rng)?;
                visits.record(space.index_of(&current)?);
            }
            debug!(chain, visits = visits.total(), "stationary chain finished");
            Ok(visits)
        })?;

        let mut merged = VisitCounter::for_states(k, self.config.state_limit);
        for counter in counters {
            merged.merge(counter);
        }
        info!(
            states = k,
            chains,
            steps = num_steps,
            burn_in,
            "stationary estimate finished"
        );
        merged.into_distribution(k)
    }
}
