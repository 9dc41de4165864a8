use ndarray::{Array2, Array3, ArrayView1, ArrayView3};

use crate::Result;

/// The output of a model's forward pass.
#[derive(Debug, Clone)]
pub struct ModelOutput {
    /// Raw scores, shaped `[batch, k]`. Only `k == 1` can be squeezed onto a window label.
    pub logits: Array2<f32>,
    /// An auxiliary feature map, shaped `[batch, features, len]`, kept for interpretability.
    pub maps: Array3<f32>,
}

/// A named, contiguous slice of a model's flat parameter buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGroup {
    pub name: String,
    pub len: usize,
}

impl ParamGroup {
    pub fn new(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            len,
        }
    }
}

/// A differentiable classifier of EEG windows.
///
/// Models don't own their parameters, they read them from a flat slice of length `size()`
/// and write their gradient into a slice of the same length.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Returns the parameter groups in the order they are laid out in the flat buffer.
    /// Their lengths must add up to `size()`.
    fn param_groups(&self) -> Vec<ParamGroup>;

    /// Makes a forward pass, caching whatever the next `backward` call needs.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - A window, shaped `[batch, channels, len]`.
    ///
    /// # Returns
    /// The logits and auxiliary maps, or an error if the shapes don't fit the model.
    fn forward(&mut self, params: &[f32], x: ArrayView3<f32>) -> Result<ModelOutput>;

    /// Backpropagates the derivative of the loss with respect to the squeezed logits of the last
    /// forward pass. The result is **accumulated** onto `grad`.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - The gradient buffer.
    /// * `d_logits` - The loss derivative, shaped `[batch]`.
    fn backward(&mut self, params: &[f32], grad: &mut [f32], d_logits: ArrayView1<f32>)
    -> Result<()>;
}
