//! NaN-safe descriptive statistics.
//!
//! NaN values are skipped by every reduction. Infinite values are kept, so a
//! divergent sample surfaces as a non-finite result that callers can reject.
//!
//! Conventions:
//! - quantiles use linear interpolation between order statistics
//!   (`h = (n - 1) q`)
//! - standard deviation is the sample estimator (`n - 1` denominator),
//!   0.0 with fewer than two values
//! - skewness and excess kurtosis are the biased moment estimators `g1`, `g2`

/// Collect the non-NaN values of `xs`.
pub fn non_nan(xs: &[f64]) -> Vec<f64> {
    xs.iter().copied().filter(|x| !x.is_nan()).collect()
}

/// Collect and sort the non-NaN values of `xs`.
pub fn sorted_non_nan(xs: &[f64]) -> Vec<f64> {
    let mut values = non_nan(xs);
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    values
}

/// Mean of the non-NaN values; NaN if there are none.
pub fn nan_mean(xs: &[f64]) -> f64 {
    let (sum, count) = xs
        .iter()
        .filter(|x| !x.is_nan())
        .fold((0.0, 0usize), |(s, c), x| (s + x, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Quantile of an already sorted, NaN-free slice.
///
/// `q` is clamped to `[0, 1]`. Returns NaN for an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Quantile of the non-NaN values of `xs`.
pub fn nan_quantile(xs: &[f64], q: f64) -> f64 {
    quantile_sorted(&sorted_non_nan(xs), q)
}

/// Median of the non-NaN values of `xs`.
pub fn nan_median(xs: &[f64]) -> f64 {
    nan_quantile(xs, 0.5)
}

/// Sample standard deviation (`ddof = 1`) of the non-NaN values.
pub fn sample_std(xs: &[f64]) -> f64 {
    let values = non_nan(xs);
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Biased central moments `(m2, m3, m4)` about the mean.
fn central_moments(values: &[f64], mean: f64) -> (f64, f64, f64) {
    let n = values.len() as f64;
    let (m2, m3, m4) = values.iter().fold((0.0, 0.0, 0.0), |(a, b, c), x| {
        let d = x - mean;
        let d2 = d * d;
        (a + d2, b + d2 * d, c + d2 * d2)
    });
    (m2 / n, m3 / n, m4 / n)
}

/// Variance indistinguishable from round-off around `mean`.
fn negligible_variance(m2: f64, mean: f64) -> bool {
    m2 <= (4.0 * f64::EPSILON * mean).powi(2)
}

/// Biased Fisher-Pearson skewness `g1`; 0.0 for a constant sample.
pub fn skewness(xs: &[f64]) -> f64 {
    let values = non_nan(xs);
    if values.is_empty() {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let (m2, m3, _) = central_moments(&values, mean);
    if negligible_variance(m2, mean) {
        0.0
    } else {
        m3 / m2.powf(1.5)
    }
}

/// Biased excess kurtosis `g2`; 0.0 for a constant sample.
pub fn excess_kurtosis(xs: &[f64]) -> f64 {
    let values = non_nan(xs);
    if values.is_empty() {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let (m2, _, m4) = central_moments(&values, mean);
    if negligible_variance(m2, mean) {
        0.0
    } else {
        m4 / (m2 * m2) - 3.0
    }
}

/// Summary statistics of a sample, computed in one pass over sorted data.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Moments {
    /// Number of non-NaN values
    pub count: usize,
    /// Mean
    pub mean: f64,
    /// Median
    pub median: f64,
    /// Sample standard deviation (ddof = 1)
    pub std: f64,
    /// Biased skewness
    pub skew: f64,
    /// Biased excess kurtosis
    pub kurtosis: f64,
    /// Minimum
    pub min: f64,
    /// Maximum
    pub max: f64,
}

impl Moments {
    /// Compute summary statistics of the non-NaN values of `xs`.
    ///
    /// An all-NaN or empty sample yields NaN for every field except `count`
    /// and `std`.
    pub fn from_samples(xs: &[f64]) -> Self {
        let sorted = sorted_non_nan(xs);
        let count = sorted.len();
        if count == 0 {
            return Self {
                count,
                mean: f64::NAN,
                median: f64::NAN,
                std: 0.0,
                skew: f64::NAN,
                kurtosis: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }

        let mean = sorted.iter().sum::<f64>() / count as f64;
        let (m2, m3, m4) = central_moments(&sorted, mean);
        let std = if count < 2 {
            0.0
        } else {
            (m2 * count as f64 / (count - 1) as f64).sqrt()
        };
        let (skew, kurtosis) = if negligible_variance(m2, mean) {
            (0.0, 0.0)
        } else {
            (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
        };

        Self {
            count,
            mean,
            median: quantile_sorted(&sorted, 0.5),
            std,
            skew,
            kurtosis,
            min: sorted[0],
            max: sorted[count - 1],
        }
    }
}
