//! Shared statistical primitives
//!
//! Quantiles with linear interpolation, Pearson correlation, and a
//! column-wise standard scaler. The scaler is fit once on a dataset and
//! persisted with the model artifacts so inference applies the exact
//! training-time transform.

use serde::{Deserialize, Serialize};

/// Linear-interpolation quantile of a sample, `q` in [0, 1]
///
/// Returns `NAN` for an empty sample.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

/// Pearson correlation coefficient
///
/// Returns `NAN` when either sample has zero variance or the lengths
/// disagree; callers decide whether that is an error.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return f64::NAN;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

/// Zero-mean, unit-variance scaler over a fixed set of columns
///
/// A constant column keeps scale 1.0 so transforming it is a no-op shift,
/// never a division by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit on parallel columns (population standard deviation)
    pub fn fit(columns: &[&[f64]]) -> Self {
        let mut means = Vec::with_capacity(columns.len());
        let mut scales = Vec::with_capacity(columns.len());
        for col in columns {
            let n = col.len().max(1) as f64;
            let mean = col.iter().sum::<f64>() / n;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            means.push(mean);
            scales.push(if std == 0.0 { 1.0 } else { std });
        }
        Self { means, scales }
    }

    /// Number of columns the scaler was fit on
    pub fn width(&self) -> usize {
        self.means.len()
    }

    /// Scale one row of values (same column order as the fit)
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    /// Scale a whole column by its index in the fit
    pub fn transform_column(&self, index: usize, column: &[f64]) -> Vec<f64> {
        column.iter().map(|v| (v - self.means[index]) / self.scales[index]).collect()
    }

    /// Undo the scaling for a single value of the indexed column
    pub fn inverse_value(&self, index: usize, value: f64) -> f64 {
        value * self.scales[index] + self.means[index]
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Quantile is bounded by the sample extremes
        #[test]
        fn quantile_within_range(
            values in proptest::collection::vec(-1e6f64..1e6, 1..100),
            q in 0.0f64..1.0,
        ) {
            let result = quantile(&values, q);
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(result >= min - 1e-9 && result <= max + 1e-9);
        }

        /// Pearson stays within [-1, 1] whenever it is defined
        #[test]
        fn pearson_bounded(
            pairs in proptest::collection::vec((-1e3f64..1e3, -1e3f64..1e3), 2..50),
        ) {
            let x: Vec<f64> = pairs.iter().map(|(a, _)| *a).collect();
            let y: Vec<f64> = pairs.iter().map(|(_, b)| *b).collect();
            let r = pearson(&x, &y);
            if !r.is_nan() {
                prop_assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&r));
            }
        }
    }
}
