//! Feed-forward estimator with a location embedding
//!
//! Architecture: an embedding table over location ids concatenated with
//! the numeric feature vector, then two relu layers of equal width and a
//! single linear output. Forward and backward passes are explicit batch
//! matrix algebra; no autograd.

use super::optim::Adam;
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One parameter slot per tensor: embedding, then weight/bias per layer
pub const PARAM_SLOTS: usize = 7;

/// Fully-connected layer
#[derive(Debug, Clone)]
struct Dense {
    weights: Array2<f32>, // in x out
    bias: Array1<f32>,
}

impl Dense {
    /// Glorot-uniform initialization
    fn new(fan_in: usize, fan_out: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
        let weights =
            Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-limit..limit));
        Self { weights, bias: Array1::zeros(fan_out) }
    }

    fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        x.dot(&self.weights) + &self.bias
    }
}

/// Regression network with a learned location embedding
#[derive(Debug, Clone)]
pub struct EstimatorNet {
    embedding: Array2<f32>, // n_locations x embedding_dim
    hidden1: Dense,
    hidden2: Dense,
    output: Dense,
    numeric_width: usize,
}

impl EstimatorNet {
    /// Build a freshly initialized network
    pub fn new(
        n_locations: usize,
        numeric_width: usize,
        embedding_dim: usize,
        hidden: usize,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let embedding =
            Array2::from_shape_fn((n_locations, embedding_dim), |_| rng.gen_range(-0.05..0.05));
        let input_width = numeric_width + embedding_dim;
        Self {
            embedding,
            hidden1: Dense::new(input_width, hidden, &mut rng),
            hidden2: Dense::new(hidden, hidden, &mut rng),
            output: Dense::new(hidden, 1, &mut rng),
            numeric_width,
        }
    }

    pub fn n_locations(&self) -> usize {
        self.embedding.nrows()
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding.ncols()
    }

    pub fn numeric_width(&self) -> usize {
        self.numeric_width
    }

    pub fn hidden(&self) -> usize {
        self.hidden1.bias.len()
    }

    /// Concatenate numeric features with the embedding row per example
    fn assemble(&self, numeric: &Array2<f32>, locations: &[usize]) -> Array2<f32> {
        debug_assert_eq!(numeric.nrows(), locations.len());
        debug_assert_eq!(numeric.ncols(), self.numeric_width);
        let dim = self.embedding_dim();
        let mut x = Array2::zeros((numeric.nrows(), self.numeric_width + dim));
        for (i, &loc) in locations.iter().enumerate() {
            for j in 0..self.numeric_width {
                x[[i, j]] = numeric[[i, j]];
            }
            for j in 0..dim {
                x[[i, self.numeric_width + j]] = self.embedding[[loc, j]];
            }
        }
        x
    }

    /// Predict one value per example
    pub fn forward(&self, numeric: &Array2<f32>, locations: &[usize]) -> Array1<f32> {
        let x = self.assemble(numeric, locations);
        let a1 = self.hidden1.forward(&x).mapv(|v| v.max(0.0));
        let a2 = self.hidden2.forward(&a1).mapv(|v| v.max(0.0));
        self.output.forward(&a2).column(0).to_owned()
    }

    /// One minibatch of gradient descent; returns the batch MSE
    pub fn train_batch(
        &mut self,
        numeric: &Array2<f32>,
        locations: &[usize],
        targets: &Array1<f32>,
        optim: &mut Adam,
    ) -> f32 {
        let n = numeric.nrows();
        let x = self.assemble(numeric, locations);

        let z1 = self.hidden1.forward(&x);
        let a1 = z1.mapv(|v| v.max(0.0));
        let z2 = self.hidden2.forward(&a1);
        let a2 = z2.mapv(|v| v.max(0.0));
        let pred = self.output.forward(&a2).column(0).to_owned();

        let diff = &pred - targets;
        let mse = diff.mapv(|d| d * d).sum() / n as f32;

        // dL/dpred for mean squared error
        let dpred = diff.mapv(|d| 2.0 * d / n as f32).insert_axis(Axis(1));

        let dw3 = a2.t().dot(&dpred);
        let db3 = dpred.sum_axis(Axis(0));
        let da2 = dpred.dot(&self.output.weights.t());
        let dz2 = &da2 * &z2.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });

        let dw2 = a1.t().dot(&dz2);
        let db2 = dz2.sum_axis(Axis(0));
        let da1 = dz2.dot(&self.hidden2.weights.t());
        let dz1 = &da1 * &z1.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });

        let dw1 = x.t().dot(&dz1);
        let db1 = dz1.sum_axis(Axis(0));
        let dx = dz1.dot(&self.hidden1.weights.t());

        // Scatter the input gradient back into the embedding rows
        let dim = self.embedding_dim();
        let mut demb = Array2::<f32>::zeros(self.embedding.raw_dim());
        for (i, &loc) in locations.iter().enumerate() {
            for j in 0..dim {
                demb[[loc, j]] += dx[[i, self.numeric_width + j]];
            }
        }

        optim.begin_step();
        update_tensor(optim, 0, &mut self.embedding, &demb);
        update_tensor(optim, 1, &mut self.hidden1.weights, &dw1);
        update_vector(optim, 2, &mut self.hidden1.bias, &db1);
        update_tensor(optim, 3, &mut self.hidden2.weights, &dw2);
        update_vector(optim, 4, &mut self.hidden2.bias, &db2);
        update_tensor(optim, 5, &mut self.output.weights, &dw3);
        update_vector(optim, 6, &mut self.output.bias, &db3);

        mse
    }

    /// Mean squared error over a held-out set
    pub fn mse(&self, numeric: &Array2<f32>, locations: &[usize], targets: &Array1<f32>) -> f32 {
        let pred = self.forward(numeric, locations);
        let diff = &pred - targets;
        diff.mapv(|d| d * d).sum() / targets.len().max(1) as f32
    }

    /// Flatten all parameters in slot order
    pub fn params_flat(&self) -> Vec<f32> {
        let mut flat = Vec::new();
        flat.extend(self.embedding.iter());
        for dense in [&self.hidden1, &self.hidden2, &self.output] {
            flat.extend(dense.weights.iter());
            flat.extend(dense.bias.iter());
        }
        flat
    }

    /// Restore parameters from a flat snapshot taken by `params_flat`
    pub fn restore_flat(&mut self, flat: &[f32]) -> Result<()> {
        let expected = self.embedding.len()
            + [&self.hidden1, &self.hidden2, &self.output]
                .iter()
                .map(|d| d.weights.len() + d.bias.len())
                .sum::<usize>();
        if flat.len() != expected {
            return Err(Error::ArtifactLoad(format!(
                "parameter snapshot has {} values, network needs {expected}",
                flat.len()
            )));
        }

        let mut offset = 0;
        let mut take = |len: usize| {
            let chunk = &flat[offset..offset + len];
            offset += len;
            chunk
        };
        let len = self.embedding.len();
        fill(&mut self.embedding, take(len));
        for dense in [&mut self.hidden1, &mut self.hidden2, &mut self.output] {
            let len = dense.weights.len();
            fill(&mut dense.weights, take(len));
            let chunk = take(dense.bias.len());
            for (b, &v) in dense.bias.iter_mut().zip(chunk) {
                *b = v;
            }
        }
        Ok(())
    }
}

fn fill(tensor: &mut Array2<f32>, values: &[f32]) {
    for (t, &v) in tensor.iter_mut().zip(values) {
        *t = v;
    }
}

fn update_tensor(optim: &mut Adam, slot: usize, param: &mut Array2<f32>, grad: &Array2<f32>) {
    let grad_slice = grad.as_slice().expect("gradient array is contiguous");
    let param_slice = param.as_slice_mut().expect("param array is contiguous");
    optim.update(slot, param_slice, grad_slice);
}

fn update_vector(optim: &mut Adam, slot: usize, param: &mut Array1<f32>, grad: &Array1<f32>) {
    let grad_slice = grad.as_slice().expect("gradient array is contiguous");
    let param_slice = param.as_slice_mut().expect("param array is contiguous");
    optim.update(slot, param_slice, grad_slice);
}
