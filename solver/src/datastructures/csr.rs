//! Compressed sparse row matrix of f64.
//!
//! `row_start[r]..row_start[r+1]` is the slice of `cols`/`vals` belonging to row r.
//! Columns within a row are sorted ascending.

use crate::error::{EgtError, Result};
use crate::par::map_range;

#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    row_start: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
}

impl CsrMatrix {
    /// Build from per-row `(column, value)` lists. Entries within a row may come in
    /// any order; duplicate columns are summed.
    pub fn from_rows(n_cols: usize, rows: Vec<Vec<(usize, f64)>>) -> Result<Self> {
        let n_rows = rows.len();
        let nnz: usize = rows.iter().map(Vec::len).sum();
        let mut row_start = Vec::with_capacity(n_rows + 1);
        let mut cols = Vec::with_capacity(nnz);
        let mut vals = Vec::with_capacity(nnz);
        row_start.push(0);

        for (r, mut row) in rows.into_iter().enumerate() {
            row.sort_unstable_by_key(|&(c, _)| c);
            for (c, v) in row {
                if c >= n_cols {
                    return Err(EgtError::InvariantViolation(format!(
                        "row {r} has column {c} outside 0..{n_cols}"
                    )));
                }
                if cols.len() > row_start[r] && cols.last() == Some(&c) {
                    if let Some(last) = vals.last_mut() {
                        *last += v;
                    }
                    continue;
                }
                cols.push(c);
                vals.push(v);
            }
            row_start.push(cols.len());
        }

        Ok(Self {
            n_rows,
            n_cols,
            row_start,
            cols,
            vals,
        })
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.vals.len()
    }

    /// Column indices and values of row `r`.
    #[inline]
    pub fn row(&self, r: usize) -> (&[usize], &[f64]) {
        let range = self.row_start[r]..self.row_start[r + 1];
        (&self.cols[range.clone()], &self.vals[range])
    }

    pub fn row_sum(&self, r: usize) -> f64 {
        self.row(r).1.iter().sum()
    }

    /// Entry (r, c), 0 when not stored.
    pub fn get(&self, r: usize, c: usize) -> f64 {
        let (cols, vals) = self.row(r);
        cols.binary_search(&c).map(|k| vals[k]).unwrap_or(0.0)
    }

    pub fn transpose(&self) -> CsrMatrix {
        let mut counts = vec![0usize; self.n_cols + 1];
        for &c in &self.cols {
            counts[c + 1] += 1;
        }
        for c in 0..self.n_cols {
            counts[c + 1] += counts[c];
        }
        let row_start = counts.clone();
        let mut next = counts;
        let mut cols = vec![0usize; self.nnz()];
        let mut vals = vec![0.0; self.nnz()];
        // Visiting source rows in order keeps each transposed row sorted.
        for r in 0..self.n_rows {
            let (rc, rv) = self.row(r);
            for (&c, &v) in rc.iter().zip(rv) {
                let slot = next[c];
                cols[slot] = r;
                vals[slot] = v;
                next[c] += 1;
            }
        }
        CsrMatrix {
            n_rows: self.n_cols,
            n_cols: self.n_rows,
            row_start,
            cols,
            vals,
        }
    }

    /// y = A·x, rows computed in parallel.
    pub fn multiply(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.n_cols);
        map_range(self.n_rows, |r| {
            let (cols, vals) = self.row(r);
            cols.iter().zip(vals).map(|(&c, &v)| v * x[c]).sum()
        })
    }

    /// Largest |r − c| over stored entries.
    pub fn bandwidth(&self) -> usize {
        (0..self.n_rows)
            .flat_map(|r| self.row(r).0.iter().map(move |&c| r.abs_diff(c)))
            .max()
            .unwrap_or(0)
    }

    /// Row-major dense copy.
    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.n_rows * self.n_cols];
        for r in 0..self.n_rows {
            let (cols, vals) = self.row(r);
            for (&c, &v) in cols.iter().zip(vals) {
                dense[r * self.n_cols + c] = v;
            }
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CsrMatrix {
        // [[0.5, 0.5, 0  ],
        //  [0,   0.2, 0.8],
        //  [1.0, 0,   0  ]]
        CsrMatrix::from_rows(
            3,
            vec![
                vec![(1, 0.5), (0, 0.5)],
                vec![(2, 0.8), (1, 0.2)],
                vec![(0, 1.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_layout() {
        let m = sample();
        assert_eq!(m.nnz(), 5);
        assert_eq!(m.row(1), (&[1usize, 2][..], &[0.2, 0.8][..]));
        assert_eq!(m.get(2, 0), 1.0);
        assert_eq!(m.get(2, 2), 0.0);
        assert!((m.row_sum(1) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_duplicates_summed() {
        let m = CsrMatrix::from_rows(2, vec![vec![(1, 0.25), (0, 0.5), (1, 0.25)]]).unwrap();
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.get(0, 1), 0.5);
    }

    #[test]
    fn test_column_out_of_range() {
        assert!(CsrMatrix::from_rows(2, vec![vec![(2, 1.0)]]).is_err());
    }

    #[test]
    fn test_transpose_and_multiply() {
        let m = sample();
        let t = m.transpose();
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(m.get(r, c), t.get(c, r));
            }
        }
        // Uniform row vector times M equals Mᵀ times the uniform column vector.
        let x = vec![1.0 / 3.0; 3];
        let y = t.multiply(&x);
        assert!((y[0] - 0.5).abs() < 1e-12);
        assert!((y[1] - 0.7 / 3.0).abs() < 1e-12);
        assert!((y.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bandwidth() {
        assert_eq!(sample().bandwidth(), 2);
        let diagonal = CsrMatrix::from_rows(3, vec![vec![(0, 1.0)], vec![(1, 1.0)], vec![(2, 1.0)]]).unwrap();
        assert_eq!(diagonal.bandwidth(), 0);
    }

    #[test]
    fn test_to_dense() {
        let d = sample().to_dense();
        assert_eq!(d, vec![0.5, 0.5, 0.0, 0.0, 0.2, 0.8, 1.0, 0.0, 0.0]);
    }
}
