use ndarray::{Array1, ArrayView1};

pub trait LossFn {
    /// Returns the loss of `y_pred` against the expected `y`.
    fn loss(&self, y_pred: ArrayView1<f32>, y: ArrayView1<f32>) -> f32;

    /// Returns the derivative of the loss with respect to each element of `y_pred`.
    fn loss_prime(&self, y_pred: ArrayView1<f32>, y: ArrayView1<f32>) -> Array1<f32>;
}
