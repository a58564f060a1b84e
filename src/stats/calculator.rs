//! Statistics Calculator Module
//! Order statistics used by the cleaning steps: medians and quantile bin edges.

use statrs::statistics::{Data, Median};

/// Probabilities of the quartile edges (min, Q1, median, Q3, max).
pub const QUARTILE_PROBS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Handles statistical calculations for the transform steps.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Median of the values, `None` when the slice is empty.
    pub fn median(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(Data::new(values.to_vec()).median())
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    ///
    /// `sorted_values` must be sorted ascending, `p` is in `[0, 100]`.
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Quartile bin edges of the values: `[min, q1, q2, q3, max]`.
    ///
    /// NaN values are ignored. Returns `None` when nothing is left.
    pub fn quartile_edges(values: &[f64]) -> Option<[f64; 5]> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut edges = [0.0; 5];
        for (edge, prob) in edges.iter_mut().zip(QUARTILE_PROBS) {
            *edge = Self::percentile(&sorted, prob * 100.0);
        }
        Some(edges)
    }

    /// Whether every edge is strictly greater than the one before it.
    pub fn edges_are_unique(edges: &[f64]) -> bool {
        edges.windows(2).all(|w| w[0] < w[1])
    }

    /// Index of the right-closed bin holding `value`; the first bin also
    /// includes the lowest edge. `None` when the value falls outside the edges.
    pub fn bin_index(edges: &[f64], value: f64) -> Option<usize> {
        let (first, rest) = edges.split_first()?;
        if value.is_nan() || value < *first {
            return None;
        }
        rest.iter().position(|edge| value <= *edge)
    }
}
