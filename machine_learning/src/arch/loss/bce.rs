use ndarray::{Array1, ArrayView1, Zip};

use super::LossFn;
use crate::arch::activations::Sigmoid;

/// Binary cross entropy computed straight from the logits, averaged over the batch.
///
/// Uses `max(z, 0) - z * y + ln(1 + e^-|z|)`, which never overflows.
#[derive(Debug, Default, Clone)]
pub struct BceWithLogits {
    sigmoid: Sigmoid,
}

impl BceWithLogits {
    /// Returns a new `BceWithLogits`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LossFn for BceWithLogits {
    fn loss(&self, y_pred: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
        let total = Zip::from(&y_pred)
            .and(&y)
            .fold(0., |acc, &z, &y| acc + z.max(0.) - z * y + (-z.abs()).exp().ln_1p());

        total / y_pred.len() as f32
    }

    fn loss_prime(&self, y_pred: ArrayView1<f32>, y: ArrayView1<f32>) -> Array1<f32> {
        let n = y_pred.len() as f32;

        Zip::from(&y_pred)
            .and(&y)
            .map_collect(|&z, &y| (self.sigmoid.f(z) - y) / n)
    }
}
