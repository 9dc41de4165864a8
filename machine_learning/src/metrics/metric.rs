use ndarray::ArrayView1;

use crate::Result;

/// A running binary classification metric.
///
/// Accumulators are never reset implicitly, the owner calls `reset` when a reported step ends.
pub trait Metric {
    /// Accumulates a batch of predictions.
    ///
    /// # Arguments
    /// * `probs` - The predicted probabilities of the positive class.
    /// * `labels` - The expected labels, 0 or 1.
    ///
    /// # Returns
    /// An error if both slices differ in length.
    fn update(&mut self, probs: ArrayView1<f32>, labels: ArrayView1<u8>) -> Result<()>;

    /// Computes the metric over everything seen since the last reset, `None` if it's undefined.
    fn compute(&self) -> Option<f32>;

    fn reset(&mut self);
}
