//! Two-player symmetric normal-form game played in a finite well-mixed population.

use crate::error::Result;
use crate::state_space::Composition;

use super::{check_focal, Game, PayoffMatrix};

/// Each individual plays every other individual once; the payoff is the average.
///
/// For a focal i-player in composition n with population Z > 1:
///
/// ```text
/// f_i(n) = Σ_j A[i][j] · (n_j − δ_ij) / (Z − 1)
/// ```
///
/// A population of one has no partners; its payoff is taken to be A[i][i].
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixGame {
    matrix: PayoffMatrix,
}

impl MatrixGame {
    pub fn new(matrix: PayoffMatrix) -> Self {
        Self { matrix }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        Ok(Self::new(PayoffMatrix::new(rows)?))
    }

    /// Prisoner's dilemma with strategy 0 = Cooperate, 1 = Defect.
    pub fn prisoners_dilemma(reward: f64, sucker: f64, temptation: f64, punishment: f64) -> Result<Self> {
        Self::from_rows(vec![vec![reward, sucker], vec![temptation, punishment]])
    }

    /// Donation game: cooperators pay `cost` to give `benefit`. 0 = Cooperate, 1 = Defect.
    pub fn donation(benefit: f64, cost: f64) -> Result<Self> {
        Self::prisoners_dilemma(benefit - cost, -cost, benefit, 0.0)
    }

    /// Hawk-dove over a resource of value `value` with fight cost `cost`. 0 = Hawk, 1 = Dove.
    pub fn hawk_dove(value: f64, cost: f64) -> Result<Self> {
        Self::from_rows(vec![
            vec![(value - cost) / 2.0, value],
            vec![0.0, value / 2.0],
        ])
    }

    pub fn payoff_matrix(&self) -> &PayoffMatrix {
        &self.matrix
    }

    /// Payoff of `focal` against one opponent playing `opponent`.
    #[inline]
    pub fn pairwise(&self, focal: usize, opponent: usize) -> f64 {
        self.matrix.get(focal, opponent)
    }
}

impl Game for MatrixGame {
    fn num_strategies(&self) -> usize {
        self.matrix.size()
    }

    fn payoff(&self, composition: &Composition, focal: usize) -> Result<f64> {
        check_focal(self.matrix.size(), composition, focal)?;
        let z = composition.population_size();
        if z == 1 {
            return Ok(self.matrix.get(focal, focal));
        }
        let row = self.matrix.row(focal);
        let total: f64 = composition
            .counts()
            .iter()
            .zip(row)
            .enumerate()
            .map(|(j, (&n, &a))| {
                let partners = if j == focal { n - 1 } else { n };
                a * partners as f64
            })
            .sum();
        Ok(total / (z - 1) as f64)
    }
}
