//! # egt: finite-population evolutionary game dynamics
//!
//! Computes how strategy frequencies evolve in a finite population under
//! stochastic selection and mutation, and reports the long-run statistics: the
//! stationary distribution over population compositions, pairwise fixation
//! probabilities and expected payoffs.
//!
//! ## Pipeline
//!
//! | Stage | Module | Description |
//! |-------|--------|-------------|
//! | 0 | [`game`], [`behavior`], [`structure`] | Payoff rule, strategy catalog, who meets whom |
//! | 1 | [`state_space`] | All K = C(Z+S−1, S−1) compositions with a dense index |
//! | 2 | [`transition`] | Per-composition transition probabilities (Fermi or Moran, plus mutation) |
//! | 3a | [`markov`] | Exact: sparse transition matrix, stationary solve, fixation recurrence |
//! | 3b | [`simulation`] | Monte Carlo: trajectories, parallel fixation runs, stationary chains |
//!
//! Stage 3a needs the matrix in memory and is capped by
//! [`EngineConfig::state_limit`](env_config::EngineConfig); stage 3b never
//! materializes it and handles any K that fits in a machine word.
//!
//! ## State representation
//!
//! A composition is a vector of S counts summing to Z. Compositions are ranked in
//! ascending lexicographic order, so index 0 is (0, …, 0, Z) and index K−1 is
//! (Z, 0, …, 0). One update moves one individual between strategies, so each row of
//! the transition matrix holds at most S·(S−1)+1 non-zeros and is stored in CSR form.
//!
//! ## Reproducibility
//!
//! All randomness flows from a [`random::RandomSource`] seed. Each Monte Carlo work
//! unit derives its own stream from (seed, unit index), so results are identical
//! for any worker count. [`set_global_seed`] fixes the process-wide seed.
//!
//! ## Features
//!
//! - `parallel` (default): rayon workers for matrix rows and Monte Carlo runs
//! - `linalg` (default): nalgebra dense LU for stationary solves up to the dense limit

#![allow(clippy::needless_range_loop)]

pub mod api;
pub mod behavior;
pub mod cancel;
pub mod constants;
pub mod datastructures;
pub mod distributions;
pub mod env_config;
pub mod error;
pub mod game;
pub mod markov;
mod par;
pub mod random;
pub mod simulation;
pub mod state_space;
pub mod structure;
pub mod transition;

pub use api::{
    build_state_space, compute_fixation_probability, compute_small_mutation_limit,
    compute_stationary_distribution, compute_strategy_distribution,
    is_accelerated_linear_algebra_enabled, is_parallel_enabled, simulate_fixation_probability,
};
pub use behavior::{Action, ActionContext, Behavior};
pub use cancel::CancelToken;
pub use datastructures::{CsrMatrix, StationaryDistribution, VisitCounter};
pub use env_config::EngineConfig;
pub use error::{EgtError, Result};
pub use game::{Game, MatrixGame, NormalFormGame, PayoffMatrix, PublicGoodsGame};
pub use markov::{MarkovAnalyzer, SmallMutationLimit, TransitionMatrix};
pub use random::{set_global_seed, RandomSource};
pub use simulation::{
    ConfidenceInterval, FixationEstimate, MonteCarloSimulator, NetworkSimulator, Trajectory,
};
pub use state_space::{Composition, StateSpace};
pub use structure::{Neighbors, PopulationStructure};
pub use transition::{TransitionEntry, TransitionModel, UpdateRule};
