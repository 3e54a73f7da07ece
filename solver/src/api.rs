//! Functional entry points.
//!
//! Each call validates its inputs, builds a [`TransitionModel`] and hands it to the
//! exact analyzer or the Monte Carlo simulator. Limits come from
//! [`EngineConfig::from_env`]. `behaviors` names the strategies by position and must
//! have one entry per game strategy.

use std::sync::Once;

use crate::behavior::Behavior;
use crate::cancel::CancelToken;
use crate::datastructures::StationaryDistribution;
use crate::env_config::EngineConfig;
use crate::error::{EgtError, Result};
use crate::game::Game;
use crate::markov::{strategy_distribution, MarkovAnalyzer, SmallMutationLimit};
use crate::random::{global_source, RandomSource};
use crate::simulation::{ConfidenceInterval, MonteCarloSimulator};
use crate::state_space::StateSpace;
use crate::structure::PopulationStructure;
use crate::transition::TransitionModel;

pub use crate::random::set_global_seed;

/// Environment-driven config. The first call also sizes the rayon pool.
fn engine_config() -> EngineConfig {
    static POOL: Once = Once::new();
    let config = EngineConfig::from_env();
    POOL.call_once(|| {
        config.init_rayon_threads_lenient();
    });
    config
}

pub fn build_state_space(population_size: usize, num_strategies: usize) -> Result<StateSpace> {
    StateSpace::new(population_size, num_strategies)
}

fn check_strategies(game: &dyn Game, behaviors: &[Behavior], num_strategies: usize) -> Result<()> {
    if behaviors.len() != num_strategies || game.num_strategies() != num_strategies {
        return Err(EgtError::invalid(
            "behaviors",
            format!(
                "{} behaviors and a {}-strategy game for {num_strategies} strategies",
                behaviors.len(),
                game.num_strategies()
            ),
        ));
    }
    behaviors.iter().try_for_each(Behavior::validate)
}

fn check_structure(structure: &PopulationStructure, population_size: usize) -> Result<()> {
    if !structure.is_well_mixed() {
        return Err(EgtError::invalid(
            "structure",
            "exact analysis needs a well-mixed population; simulate networks instead",
        ));
    }
    if structure.size() != population_size {
        return Err(EgtError::invalid(
            "structure",
            format!(
                "population of {} does not match population_size {population_size}",
                structure.size()
            ),
        ));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn exact_model<'g>(
    game: &'g dyn Game,
    behaviors: &[Behavior],
    structure: &PopulationStructure,
    population_size: usize,
    num_strategies: usize,
    mutation_rate: f64,
    selection_intensity: f64,
) -> Result<TransitionModel<'g>> {
    check_strategies(game, behaviors, num_strategies)?;
    check_structure(structure, population_size)?;
    let space = StateSpace::new(population_size, num_strategies)?;
    TransitionModel::new(game, space, mutation_rate, selection_intensity)
}

/// Stationary distribution over compositions, indexed like [`StateSpace::enumerate`].
pub fn compute_stationary_distribution(
    game: &dyn Game,
    behaviors: &[Behavior],
    structure: &PopulationStructure,
    population_size: usize,
    num_strategies: usize,
    mutation_rate: f64,
    selection_intensity: f64,
) -> Result<StationaryDistribution> {
    let model = exact_model(
        game,
        behaviors,
        structure,
        population_size,
        num_strategies,
        mutation_rate,
        selection_intensity,
    )?;
    if mutation_rate <= 0.0 {
        return Err(EgtError::NonErgodicChain { mutation_rate });
    }
    let analyzer = MarkovAnalyzer::new(engine_config());
    let cancel = CancelToken::new();
    let matrix = analyzer.build_transition_matrix(&model, &cancel)?;
    analyzer.stationary_distribution(&matrix, &cancel)
}

/// Long-run frequency of each strategy under the stationary distribution.
pub fn compute_strategy_distribution(
    game: &dyn Game,
    behaviors: &[Behavior],
    structure: &PopulationStructure,
    population_size: usize,
    num_strategies: usize,
    mutation_rate: f64,
    selection_intensity: f64,
) -> Result<Vec<f64>> {
    let stationary = compute_stationary_distribution(
        game,
        behaviors,
        structure,
        population_size,
        num_strategies,
        mutation_rate,
        selection_intensity,
    )?;
    strategy_distribution(&StateSpace::new(population_size, num_strategies)?, &stationary)
}

fn fixation_model<'g>(
    game: &'g dyn Game,
    behaviors: &[Behavior],
    population_size: usize,
    selection_intensity: f64,
) -> Result<TransitionModel<'g>> {
    let num_strategies = game.num_strategies();
    check_strategies(game, behaviors, num_strategies)?;
    let space = StateSpace::new(population_size, num_strategies)?;
    TransitionModel::new(game, space, 0.0, selection_intensity)
}

/// Exact probability that one `invader` takes over a well-mixed population of
/// `resident`s.
pub fn compute_fixation_probability(
    game: &dyn Game,
    behaviors: &[Behavior],
    population_size: usize,
    selection_intensity: f64,
    invader: usize,
    resident: usize,
) -> Result<f64> {
    let model = fixation_model(game, behaviors, population_size, selection_intensity)?;
    MarkovAnalyzer::new(engine_config()).fixation_probability(&model, invader, resident)
}

/// Monte Carlo fixation estimate with its 95% Wilson interval.
///
/// `seed = None` draws from the process-wide source, so a preceding
/// [`set_global_seed`] makes the result reproducible.
#[allow(clippy::too_many_arguments)]
pub fn simulate_fixation_probability(
    game: &dyn Game,
    behaviors: &[Behavior],
    population_size: usize,
    selection_intensity: f64,
    invader: usize,
    resident: usize,
    num_runs: usize,
    seed: Option<u64>,
) -> Result<(f64, ConfidenceInterval)> {
    let model = fixation_model(game, behaviors, population_size, selection_intensity)?;
    let source = seed.map_or_else(global_source, RandomSource::new);
    let estimate = MonteCarloSimulator::new(engine_config()).estimate_fixation_probability(
        &model,
        invader,
        resident,
        num_runs,
        &source,
        &CancelToken::new(),
    )?;
    Ok((estimate.probability, estimate.interval))
}

/// Embedded monomorphic chain in the limit of rare mutations.
pub fn compute_small_mutation_limit(
    game: &dyn Game,
    behaviors: &[Behavior],
    population_size: usize,
    selection_intensity: f64,
) -> Result<SmallMutationLimit> {
    let model = fixation_model(game, behaviors, population_size, selection_intensity)?;
    MarkovAnalyzer::new(engine_config()).small_mutation_limit(&model, &CancelToken::new())
}

/// True when the dense LU solver (`linalg` feature) is compiled in.
pub fn is_accelerated_linear_algebra_enabled() -> bool {
    cfg!(feature = "linalg")
}

/// True when rayon workers (`parallel` feature) are compiled in.
pub fn is_parallel_enabled() -> bool {
    cfg!(feature = "parallel")
}
