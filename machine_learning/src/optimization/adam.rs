use super::Optimizer;
use crate::{MlErr, Result};

/// Adam with L2 weight decay: the decayed parameter is added to the gradient before the moments
/// are updated.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    beta2_t: f32,
    weight_decay: f32,
    v: Box<[f32]>,
    s: Box<[f32]>,
    epsilon: f32,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            beta1_t: 1.,
            beta2_t: 1.,
            weight_decay: 0.,
            v: vec![0.; len].into_boxed_slice(),
            s: vec![0.; len].into_boxed_slice(),
            epsilon,
        }
    }

    /// Sets the L2 penalty coefficient.
    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn weight_decay(&self) -> f32 {
        self.weight_decay
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        if grad.len() != params.len() || params.len() != self.v.len() {
            return Err(MlErr::SizeMismatch {
                what: "optimizer params",
                got: grad.len(),
                expected: self.v.len(),
            });
        }

        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            weight_decay: wd,
            ..
        } = *self;

        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let bc1 = 1. - self.beta1_t;
        let bc2 = 1. - self.beta2_t;
        let step_size = lr * (bc2.sqrt() / bc1);

        params
            .iter_mut()
            .zip(grad)
            .zip(self.v.iter_mut())
            .zip(self.s.iter_mut())
            .for_each(|(((p, &g), v), s)| {
                let g = g + wd * *p;
                *v = b1 * *v + (1. - b1) * g;
                *s = b2 * *s + (1. - b2) * g.powi(2);
                *p -= step_size * *v / (s.sqrt() + eps);
            });

        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn first_step_moves_by_the_learning_rate() {
        let mut adam = Adam::new(2, 0.1, 0.9, 0.999, 1e-8);
        let mut params = [1., -1.];

        adam.update_params(&mut params, &[0.5, -3.]).unwrap();

        // The bias corrected first step is lr * sign(g).
        assert_abs_diff_eq!(params[0], 0.9, epsilon = 1e-5);
        assert_abs_diff_eq!(params[1], -0.9, epsilon = 1e-5);
    }

    #[test]
    fn weight_decay_pulls_towards_zero_without_gradient() {
        let mut adam = Adam::new(1, 0.01, 0.9, 0.999, 1e-8).with_weight_decay(0.1);
        let mut params = [2.];

        adam.update_params(&mut params, &[0.]).unwrap();

        assert!(params[0] < 2.);
    }

    #[test]
    fn mismatched_lengths_fail() {
        let mut adam = Adam::new(2, 0.1, 0.9, 0.999, 1e-8);
        let mut params = [1., 2.];

        assert!(adam.update_params(&mut params, &[1.]).is_err());
    }

    #[test]
    fn learning_rate_can_be_overridden() {
        let mut adam = Adam::new(1, 0.1, 0.9, 0.999, 1e-8);
        adam.set_learning_rate(0.5);

        assert_eq!(adam.learning_rate(), 0.5);
    }
}
