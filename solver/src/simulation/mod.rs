//! Monte Carlo simulation.
//!
//! - [`trajectory`]: a single random walk over compositions
//! - [`engine`]: parallel fixation and stationary estimates ([`MonteCarloSimulator`])
//! - [`statistics`]: Wilson intervals and fixation estimates
//! - [`network`]: individual-level dynamics on a [`crate::structure::PopulationStructure`]

pub mod engine;
pub mod network;
pub mod statistics;
pub mod trajectory;

pub use engine::MonteCarloSimulator;
pub use network::{NetworkRun, NetworkSimulator};
pub use statistics::{ConfidenceInterval, FixationEstimate};
pub use trajectory::{run_trajectory, Trajectory};
