//! Combinatorics and sampling helpers shared by the state space, games and simulators.
//!
//! - [`binomial`]: exact C(n, k) with overflow detection
//! - [`ln_binomial`]: ln C(n, k) for probability weights that overflow u64
//! - [`stars_bars`]: number of compositions of Z into S parts
//! - [`multivariate_hypergeometric_pmf`]: group-sampling probabilities without replacement
//! - [`sample_simplex`]: uniform random composition

use rand::Rng;

/// Exact C(n, k), or `None` if the result does not fit in a u128.
///
/// Multiplicative form `C(n-k+i, i) = C(n-k+i-1, i-1) · (n-k+i) / i`; each partial
/// product is itself a binomial coefficient, so the division is always exact.
pub fn binomial(n: u64, k: u64) -> Option<u128> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let base = (n - k) as u128;
    let mut acc: u128 = 1;
    for i in 1..=k as u128 {
        acc = acc.checked_mul(base + i)? / i;
    }
    Some(acc)
}

/// ln C(n, k). Returns `f64::NEG_INFINITY` when k > n.
pub fn ln_binomial(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    let k = k.min(n - k);
    let base = (n - k) as f64;
    (1..=k).map(|i| ((base + i as f64) / i as f64).ln()).sum()
}

/// Number of compositions of `population_size` into `num_strategies` non-negative parts:
/// C(Z + S − 1, S − 1). `None` on overflow or when S is 0.
pub fn stars_bars(population_size: u64, num_strategies: u64) -> Option<u128> {
    if num_strategies == 0 {
        return None;
    }
    binomial(population_size.checked_add(num_strategies - 1)?, num_strategies - 1)
}

/// Probability of drawing exactly `sample[i]` items of each kind `i` when drawing
/// `Σ sample` items without replacement from a population with `population[i]` of each kind.
pub fn multivariate_hypergeometric_pmf(population: &[u32], sample: &[u32]) -> f64 {
    debug_assert_eq!(population.len(), sample.len());
    if sample.iter().zip(population).any(|(&k, &n)| k > n) {
        return 0.0;
    }
    let total: u64 = population.iter().map(|&n| n as u64).sum();
    let drawn: u64 = sample.iter().map(|&k| k as u64).sum();
    let numerator: f64 = population
        .iter()
        .zip(sample)
        .map(|(&n, &k)| ln_binomial(n as u64, k as u64))
        .sum();
    (numerator - ln_binomial(total, drawn)).exp()
}

/// Uniformly random composition of `population_size` into `num_strategies` parts.
///
/// Stars and bars: choose S−1 bar positions among Z+S−1 slots; the gaps between
/// consecutive bars are the counts.
pub fn sample_simplex<R: Rng + ?Sized>(
    population_size: u32,
    num_strategies: usize,
    rng: &mut R,
) -> Vec<u32> {
    if num_strategies == 0 {
        return Vec::new();
    }
    let slots = population_size as usize + num_strategies - 1;
    let mut bars = rand::seq::index::sample(rng, slots, num_strategies - 1).into_vec();
    bars.sort_unstable();

    let mut counts = Vec::with_capacity(num_strategies);
    let mut previous: isize = -1;
    for &bar in &bars {
        counts.push((bar as isize - previous - 1) as u32);
        previous = bar as isize;
    }
    counts.push((slots as isize - previous - 1) as u32);
    counts
}

/// ln(1 + eˣ) without overflow.
#[inline]
pub fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

/// ln Σ exp(xᵢ) without overflow. Empty or all −∞ input gives −∞.
pub fn log_sum_exp(values: impl IntoIterator<Item = f64> + Clone) -> f64 {
    let max = values
        .clone()
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return max;
    }
    if max == f64::INFINITY {
        return max;
    }
    let sum: f64 = values.into_iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_binomial_small() {
        assert_eq!(binomial(5, 2), Some(10));
        assert_eq!(binomial(10, 0), Some(1));
        assert_eq!(binomial(10, 10), Some(1));
        assert_eq!(binomial(3, 5), Some(0));
        assert_eq!(binomial(60, 30), Some(118_264_581_564_861_424));
    }

    #[test]
    fn test_ln_binomial_matches_exact() {
        for n in 0..40u64 {
            for k in 0..=n {
                let exact = binomial(n, k).unwrap() as f64;
                assert!((ln_binomial(n, k) - exact.ln()).abs() < 1e-9, "n={n} k={k}");
            }
        }
    }

    #[test]
    fn test_stars_bars() {
        assert_eq!(stars_bars(4, 1), Some(1));
        assert_eq!(stars_bars(4, 2), Some(5));
        assert_eq!(stars_bars(5, 3), Some(21));
        assert_eq!(stars_bars(4, 0), None);
    }

    #[test]
    fn test_hypergeometric_sums_to_one() {
        let population = [4u32, 3, 5];
        let mut total = 0.0;
        for a in 0..=4u32 {
            for b in 0..=3u32 {
                if a + b <= 4 {
                    let c = 4 - a - b;
                    total += multivariate_hypergeometric_pmf(&population, &[a, b, c]);
                }
            }
        }
        assert!((total - 1.0).abs() < 1e-12, "total={total}");
    }

    #[test]
    fn test_hypergeometric_impossible_draw() {
        assert_eq!(multivariate_hypergeometric_pmf(&[1, 2], &[2, 0]), 0.0);
    }

    #[test]
    fn test_sample_simplex_sums() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..1000 {
            let counts = sample_simplex(17, 4, &mut rng);
            assert_eq!(counts.len(), 4);
            assert_eq!(counts.iter().sum::<u32>(), 17);
        }
        assert_eq!(sample_simplex(9, 1, &mut rng), vec![9]);
    }

    #[test]
    fn test_softplus_and_lse_stable() {
        assert!((softplus(0.0) - 2f64.ln()).abs() < 1e-15);
        assert!((softplus(1000.0) - 1000.0).abs() < 1e-12);
        assert!(softplus(-1000.0) >= 0.0);
        let lse = log_sum_exp([1000.0, 1000.0]);
        assert!((lse - (1000.0 + 2f64.ln())).abs() < 1e-9);
        assert_eq!(log_sum_exp(Vec::<f64>::new()), f64::NEG_INFINITY);
    }
}
