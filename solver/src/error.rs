//! Error taxonomy shared by every fallible operation in the crate.

use thiserror::Error;

/// Errors returned by state-space construction, transition computation and both solvers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EgtError {
    /// Malformed population size, strategy count, rate or strategy id. Caller error.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// State space too large for exact analysis; switch to Monte Carlo.
    #[error("state space has {states} compositions, exceeding the exact-analysis limit of {limit}")]
    SizeLimitExceeded { states: usize, limit: usize },

    /// Stationary analysis requested for a chain without mutation.
    #[error("chain is not ergodic: mutation rate {mutation_rate} must be positive")]
    NonErgodicChain { mutation_rate: f64 },

    /// A game was asked for the payoff of a strategy absent from the composition.
    #[error("strategy {strategy} is absent from composition {composition:?}")]
    DomainError {
        strategy: usize,
        composition: Vec<u32>,
    },

    /// Cooperative cancellation was honored; partial work was discarded.
    #[error("operation cancelled")]
    Cancelled,

    /// Engine or game-contract bug: probabilities failed validation or a solve broke down.
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

impl EgtError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        EgtError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, EgtError>;
