//! Index-range maps that run on the rayon pool when the `parallel` feature is on
//! and sequentially otherwise. Output order always follows the index order.

use crate::error::Result;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub(crate) fn map_range<T, F>(len: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        (0..len).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..len).map(f).collect()
    }
}

/// Like [`map_range`], stopping at the first error.
pub(crate) fn try_map_range<T, F>(len: usize, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        (0..len).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..len).map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EgtError;

    #[test]
    fn test_order_preserved() {
        let squares = map_range(100, |i| i * i);
        assert_eq!(squares[7], 49);
        assert_eq!(squares.len(), 100);
    }

    #[test]
    fn test_error_propagates() {
        let out = try_map_range(50, |i| {
            if i == 30 {
                Err(EgtError::Cancelled)
            } else {
                Ok(i)
            }
        });
        assert_eq!(out, Err(EgtError::Cancelled));
        assert_eq!(try_map_range(3, Ok).unwrap(), vec![0, 1, 2]);
    }
}
