//! Payoff rules.
//!
//! The engine only needs [`Game::payoff`]: the expected payoff to a focal strategy
//! given the population composition. Three games implement it:
//!
//! - [`MatrixGame`]: two-player symmetric normal-form game in a finite population
//! - [`NormalFormGame`]: repeated two-action game between [`crate::behavior::Behavior`]s
//! - [`PublicGoodsGame`]: N-player public goods game with groups drawn without replacement

pub mod matrix;
pub mod normal_form;
pub mod public_goods;

pub use matrix::MatrixGame;
pub use normal_form::NormalFormGame;
pub use public_goods::PublicGoodsGame;

use serde::Serialize;

use crate::error::{EgtError, Result};
use crate::state_space::Composition;

/// Expected payoffs of strategies in a finite population.
///
/// Implementations must be deterministic and thread-safe: payoffs are queried
/// concurrently by matrix assembly and Monte Carlo workers.
pub trait Game: Send + Sync {
    fn num_strategies(&self) -> usize;

    /// Expected payoff to an individual playing `focal` in `composition`.
    ///
    /// Fails with DomainError when `focal` has zero count, and with InvalidParameter
    /// when `focal` or the composition width does not match [`Game::num_strategies`].
    fn payoff(&self, composition: &Composition, focal: usize) -> Result<f64>;

    /// Payoff of every strategy; `None` for absent strategies.
    fn payoffs(&self, composition: &Composition) -> Result<Vec<Option<f64>>> {
        (0..self.num_strategies())
            .map(|s| {
                if composition.is_present(s) {
                    self.payoff(composition, s).map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect()
    }
}

/// Contract checks shared by every [`Game`] implementation.
pub(crate) fn check_focal(
    num_strategies: usize,
    composition: &Composition,
    focal: usize,
) -> Result<()> {
    if composition.num_strategies() != num_strategies {
        return Err(EgtError::invalid(
            "composition",
            format!(
                "has {} strategies, game has {}",
                composition.num_strategies(),
                num_strategies
            ),
        ));
    }
    if focal >= num_strategies {
        return Err(EgtError::invalid(
            "focal_strategy",
            format!("{focal} out of range for {num_strategies} strategies"),
        ));
    }
    if !composition.is_present(focal) {
        return Err(EgtError::DomainError {
            strategy: focal,
            composition: composition.counts().to_vec(),
        });
    }
    Ok(())
}

/// Square payoff matrix: entry (i, j) is the payoff of strategy i against strategy j.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PayoffMatrix {
    size: usize,
    values: Vec<f64>,
}

impl PayoffMatrix {
    /// Fails with InvalidParameter unless `rows` is non-empty, square and finite.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let size = rows.len();
        if size == 0 {
            return Err(EgtError::invalid("payoff_matrix", "is empty"));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != size) {
            return Err(EgtError::invalid(
                "payoff_matrix",
                format!("row {i} has {} entries, expected {size}", row.len()),
            ));
        }
        let values: Vec<f64> = rows.into_iter().flatten().collect();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(EgtError::invalid("payoff_matrix", "contains a non-finite entry"));
        }
        Ok(Self { size, values })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.size + col]
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.size..(row + 1) * self.size]
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.values.chunks(self.size).map(<[f64]>::to_vec).collect()
    }
}
