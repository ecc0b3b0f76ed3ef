//! Adam optimizer
//!
//! Plain Adam (no weight decay) over a fixed set of parameter slots, one
//! slot per tensor of the network. Moment buffers are lazily allocated on
//! the first update of each slot.
//!
//! Bias correction is folded into the step size:
//! lr_t = lr * sqrt(1 - β2^t) / (1 - β1^t)

use ndarray::Array1;

/// Adam optimizer state
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: u64,
    m: Vec<Option<Array1<f32>>>, // First moment
    v: Vec<Option<Array1<f32>>>, // Second moment
}

impl Adam {
    /// Create a new Adam optimizer for `slots` parameter tensors
    pub fn new(slots: usize, lr: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: vec![None; slots],
            v: vec![None; slots],
        }
    }

    /// Adam with the usual defaults
    pub fn default_params(slots: usize, lr: f32) -> Self {
        Self::new(slots, lr, 0.9, 0.999, 1e-7)
    }

    /// Advance the step counter; call once per minibatch, before updates
    pub fn begin_step(&mut self) {
        self.t += 1;
    }

    /// Apply one Adam update to a parameter slot
    ///
    /// `param` and `grad` are the flattened tensor and its gradient; their
    /// lengths must agree and must not change between calls for a slot.
    pub fn update(&mut self, slot: usize, param: &mut [f32], grad: &[f32]) {
        debug_assert_eq!(param.len(), grad.len());
        let lr_t = self.lr
            * ((1.0 - self.beta2.powi(self.t as i32)).sqrt()
                / (1.0 - self.beta1.powi(self.t as i32)));

        let m = self.m[slot].get_or_insert_with(|| Array1::zeros(param.len()));
        let v = self.v[slot].get_or_insert_with(|| Array1::zeros(param.len()));

        for i in 0..param.len() {
            let g = grad[i];
            // m_t = β1 * m_{t-1} + (1 - β1) * g
            m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * g;
            // v_t = β2 * v_{t-1} + (1 - β2) * g²
            v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * g * g;
            param[i] -= lr_t * m[i] / (v[i].sqrt() + self.epsilon);
        }
    }
}
