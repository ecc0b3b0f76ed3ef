//! Minibatch training loop with early stopping
//!
//! Holds out a test fold and a validation fold, trains with Adam on
//! shuffled minibatches, and stops once validation loss has not improved
//! for a fixed number of epochs. The best-validation snapshot is restored
//! before the test fold is scored, so the reported test MSE belongs to
//! the weights the caller receives.

use super::net::{EstimatorNet, PARAM_SLOTS};
use super::optim::Adam;
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Epochs without validation improvement before stopping
    pub patience: usize,
    pub learning_rate: f32,
    pub seed: u64,
    pub embedding_dim: usize,
    pub hidden: usize,
    /// Fraction held out for the final test score
    pub test_fraction: f64,
    /// Fraction of the remainder held out for early stopping
    pub valid_fraction: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 32,
            patience: 5,
            learning_rate: 1e-3,
            seed: 42,
            embedding_dim: 10,
            hidden: 64,
            test_fraction: 0.2,
            valid_fraction: 0.2,
        }
    }
}

/// Outcome of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    pub epochs_run: usize,
    pub best_val_mse: f32,
    /// MSE on the held-out test fold, scored with the restored best weights
    pub test_mse: f32,
}

/// Shuffle `0..n` and split off a held-out fraction
///
/// Returns `(kept, held)`. Both sides are non-empty for any `n >= 2` and
/// fraction in (0, 1).
pub fn split_indices(n: usize, fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let held = ((n as f64 * fraction).round() as usize).clamp(1, n.saturating_sub(1).max(1));
    let kept = indices.split_off(held);
    (kept, indices)
}

fn gather(
    numeric: &Array2<f32>,
    locations: &[usize],
    targets: &Array1<f32>,
    indices: &[usize],
) -> (Array2<f32>, Vec<usize>, Array1<f32>) {
    let mut num = Array2::zeros((indices.len(), numeric.ncols()));
    let mut locs = Vec::with_capacity(indices.len());
    let mut tgt = Array1::zeros(indices.len());
    for (row, &i) in indices.iter().enumerate() {
        num.index_axis_mut(Axis(0), row).assign(&numeric.index_axis(Axis(0), i));
        locs.push(locations[i]);
        tgt[row] = targets[i];
    }
    (num, locs, tgt)
}

/// Train a fresh estimator on the given matrix
///
/// `numeric` is one row per example in feature order; `locations` are
/// dense ids below `n_locations`; `targets` are already scaled.
pub fn fit(
    n_locations: usize,
    numeric: &Array2<f32>,
    locations: &[usize],
    targets: &Array1<f32>,
    config: &TrainConfig,
) -> Result<(EstimatorNet, TrainReport)> {
    let n = numeric.nrows();
    if n != locations.len() || n != targets.len() {
        return Err(Error::EmptyInput(format!(
            "inconsistent training inputs: {n} rows, {} locations, {} targets",
            locations.len(),
            targets.len()
        )));
    }
    if n < 5 {
        return Err(Error::EmptyInput(format!("{n} rows are too few to train on")));
    }

    let (rest, test) = split_indices(n, config.test_fraction, config.seed);
    let (train, valid) = {
        let (kept, held) = split_indices(rest.len(), config.valid_fraction, config.seed);
        (
            kept.iter().map(|&i| rest[i]).collect::<Vec<_>>(),
            held.iter().map(|&i| rest[i]).collect::<Vec<_>>(),
        )
    };

    let (train_num, train_loc, train_tgt) = gather(numeric, locations, targets, &train);
    let (valid_num, valid_loc, valid_tgt) = gather(numeric, locations, targets, &valid);
    let (test_num, test_loc, test_tgt) = gather(numeric, locations, targets, &test);

    let mut net = EstimatorNet::new(
        n_locations,
        numeric.ncols(),
        config.embedding_dim,
        config.hidden,
        config.seed,
    );
    let mut optim = Adam::default_params(PARAM_SLOTS, config.learning_rate);

    let mut epoch_rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
    let mut order: Vec<usize> = (0..train.len()).collect();

    let mut best_val = f32::INFINITY;
    let mut best_params = net.params_flat();
    let mut wait = 0usize;
    let mut epochs_run = 0usize;

    for _ in 0..config.epochs {
        epochs_run += 1;
        order.shuffle(&mut epoch_rng);

        for batch in order.chunks(config.batch_size) {
            let (num, loc, tgt) = gather(&train_num, &train_loc, &train_tgt, batch);
            net.train_batch(&num, &loc, &tgt, &mut optim);
        }

        let val_mse = net.mse(&valid_num, &valid_loc, &valid_tgt);
        if val_mse < best_val {
            best_val = val_mse;
            best_params = net.params_flat();
            wait = 0;
        } else {
            wait += 1;
            if wait >= config.patience {
                break;
            }
        }
    }

    net.restore_flat(&best_params)?;
    let test_mse = net.mse(&test_num, &test_loc, &test_tgt);

    Ok((net, TrainReport { epochs_run, best_val_mse: best_val, test_mse }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_dataset(n: usize) -> (Array2<f32>, Vec<usize>, Array1<f32>) {
        let mut numeric = Array2::zeros((n, 2));
        let mut locations = Vec::with_capacity(n);
        let mut targets = Array1::zeros(n);
        for i in 0..n {
            let a = (i % 13) as f32 / 13.0 - 0.5;
            let b = (i % 7) as f32 / 7.0 - 0.5;
            let loc = i % 3;
            numeric[[i, 0]] = a;
            numeric[[i, 1]] = b;
            locations.push(loc);
            targets[i] = 0.8 * a - 0.3 * b + 0.1 * loc as f32;
        }
        (numeric, locations, targets)
    }

    #[test]
    fn test_split_indices_partitions() {
        let (kept, held) = split_indices(100, 0.2, 42);
        assert_eq!(kept.len(), 80);
        assert_eq!(held.len(), 20);
        let mut all: Vec<usize> = kept.iter().chain(&held).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_indices_deterministic() {
        assert_eq!(split_indices(50, 0.2, 7), split_indices(50, 0.2, 7));
        assert_ne!(split_indices(50, 0.2, 7), split_indices(50, 0.2, 8));
    }

    #[test]
    fn test_split_indices_small_n_keeps_both_sides() {
        let (kept, held) = split_indices(2, 0.2, 0);
        assert_eq!(kept.len(), 1);
        assert_eq!(held.len(), 1);
    }

    #[test]
    fn test_fit_learns_linear_signal() {
        let (numeric, locations, targets) = linear_dataset(200);
        let config = TrainConfig {
            epochs: 60,
            hidden: 16,
            embedding_dim: 3,
            learning_rate: 5e-3,
            ..TrainConfig::default()
        };
        let (net, report) = fit(3, &numeric, &locations, &targets, &config).unwrap();

        assert!(report.epochs_run >= 1 && report.epochs_run <= 60);
        // Targets have variance around 0.06; a fitted net should do far better
        assert!(report.test_mse < 0.02, "test mse {}", report.test_mse);
        assert!(net.mse(&numeric, &locations, &targets) < 0.02);
    }

    #[test]
    fn test_fit_deterministic_for_seed() {
        let (numeric, locations, targets) = linear_dataset(80);
        let config =
            TrainConfig { epochs: 10, hidden: 8, embedding_dim: 2, ..TrainConfig::default() };
        let (net_a, rep_a) = fit(3, &numeric, &locations, &targets, &config).unwrap();
        let (net_b, rep_b) = fit(3, &numeric, &locations, &targets, &config).unwrap();
        assert_eq!(net_a.params_flat(), net_b.params_flat());
        assert_eq!(rep_a, rep_b);
    }

    #[test]
    fn test_fit_rejects_tiny_input() {
        let numeric = Array2::zeros((3, 2));
        let targets = Array1::zeros(3);
        assert!(matches!(
            fit(1, &numeric, &[0, 0, 0], &targets, &TrainConfig::default()),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn test_fit_rejects_mismatched_lengths() {
        let numeric = Array2::zeros((10, 2));
        let targets = Array1::zeros(9);
        assert!(fit(1, &numeric, &vec![0; 10], &targets, &TrainConfig::default()).is_err());
    }
}
