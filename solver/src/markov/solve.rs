//! Stationary vector of a row-stochastic CSR matrix.
//!
//! Two direct methods:
//!
//! - **Dense LU** (`linalg` feature): solve (Mᵀ − I)·π = 0 with the last equation
//!   replaced by Σπ = 1. O(K³), used up to the dense limit.
//! - **Banded GTH elimination**: Grassmann–Taksar–Heyman state reduction on the
//!   band of M. Single-switch moves keep lexicographic neighbors close, so the
//!   half-bandwidth w is about C(Z+S−2, S−2) and the cost is O(K·w²). No
//!   subtractions occur, which keeps the result accurate for nearly decomposable
//!   chains (small μ with several stable states) where iterating π·M converges
//!   too slowly to detect.
//!
//! ```text
//! for n = K−1 down to 1:
//!     s_n = Σ_{j<n} p(n, j)
//!     p(i, n) ← p(i, n) / s_n                     i < n
//!     p(i, j) ← p(i, j) + p(i, n)·p(n, j)         i, j < n
//! π(0) = 1,  π(j) = Σ_{i<j} π(i)·p(i, j)
//! ```

use tracing::debug;

use crate::cancel::CancelToken;
use crate::datastructures::CsrMatrix;
use crate::error::{EgtError, Result};

/// Running weights above this are rescaled during back substitution.
const RESCALE_ABOVE: f64 = 1e150;

#[cfg(feature = "linalg")]
pub(crate) fn dense_lu(matrix: &CsrMatrix) -> Result<Vec<f64>> {
    use nalgebra::{DMatrix, DVector};

    let k = matrix.n_rows();
    let m = DMatrix::from_row_slice(k, k, &matrix.to_dense());
    let mut a = m.transpose() - DMatrix::<f64>::identity(k, k);
    a.row_mut(k - 1).fill(1.0);
    let mut b = DVector::<f64>::zeros(k);
    b[k - 1] = 1.0;

    let solution = a
        .lu()
        .solve(&b)
        .ok_or_else(|| EgtError::InvariantViolation(format!("singular {k}×{k} stationary system")))?;
    Ok(solution.iter().copied().collect())
}

/// Unnormalized stationary weights by GTH elimination on the band of `matrix`.
///
/// Fails with SizeLimitExceeded when the band needs more than `band_limit` stored
/// entries; `limit` is then the largest K that would fit at this bandwidth. A state
/// that cannot reach any lower-indexed state once higher states are eliminated means
/// the chain is reducible, reported as InvariantViolation.
pub(crate) fn banded_gth(matrix: &CsrMatrix, band_limit: usize, cancel: &CancelToken) -> Result<Vec<f64>> {
    let k = matrix.n_rows();
    let width = matrix.bandwidth();
    let stride = 2 * width + 1;
    let entries = k
        .checked_mul(stride)
        .filter(|&n| n <= band_limit)
        .ok_or(EgtError::SizeLimitExceeded {
            states: k,
            limit: band_limit / stride,
        })?;
    debug!(states = k, width, entries, "banded elimination");

    // (i, j) with |i − j| ≤ width, row-major within the band.
    let at = move |i: usize, j: usize| i * stride + j + width - i;
    let mut band = vec![0.0; entries];
    for r in 0..k {
        let (cols, vals) = matrix.row(r);
        for (&c, &v) in cols.iter().zip(vals) {
            band[at(r, c)] = v;
        }
    }

    for n in (1..k).rev() {
        cancel.check()?;
        let lo = n.saturating_sub(width);
        let leaving: f64 = (lo..n).map(|j| band[at(n, j)]).sum();
        if !(leaving > 0.0) {
            return Err(EgtError::InvariantViolation(format!(
                "state {n} cannot reach any state below it; the chain is reducible"
            )));
        }
        for i in lo..n {
            let into_n = band[at(i, n)];
            if into_n == 0.0 {
                continue;
            }
            let factor = into_n / leaving;
            band[at(i, n)] = factor;
            for j in (lo..n).filter(|&j| j != i) {
                band[at(i, j)] += factor * band[at(n, j)];
            }
        }
    }

    let mut weights = vec![0.0; k];
    weights[0] = 1.0;
    for j in 1..k {
        let lo = j.saturating_sub(width);
        let mut value: f64 = (lo..j).map(|i| weights[i] * band[at(i, j)]).sum();
        if value > RESCALE_ABOVE {
            for w in &mut weights[..j] {
                *w /= RESCALE_ABOVE;
            }
            value /= RESCALE_ABOVE;
        }
        weights[j] = value;
    }
    Ok(weights)
}
