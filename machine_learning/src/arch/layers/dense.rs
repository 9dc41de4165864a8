use ndarray::{linalg, prelude::*};

use crate::{MlErr, Result};

/// A fully connected linear layer over `[batch, features]` inputs, used as the logit head.
///
/// Optimizations:
///   1. Find a way to not copy `x` in each `Dense::forward` call.
#[derive(Clone, Debug)]
pub struct Dense {
    dim: (usize, usize),
    size: usize,

    // Forward metadata
    x: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense`.
    ///
    /// # Arguments
    /// * `dim` - The amount of input and output features.
    ///
    /// # Returns
    /// A new `Dense` instance.
    pub fn new(dim: (usize, usize)) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            x: Array2::zeros((0, 0)),
        }
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the amount of weights this layer has, biases excluded.
    pub fn weight_size(&self) -> usize {
        self.size - self.dim.1
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                what: "dense input features",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let (w, b) = self.view_params(params)?;
        let mut z = Array2::zeros((x.nrows(), self.dim.1));
        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut z);
        z += &b;

        self.x = x.to_owned();
        Ok(z)
    }

    /// Backpropagates `d`, accumulating the weight and bias derivatives onto `grad`.
    ///
    /// # Returns
    /// The delta with respect to the input of the last forward pass.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        let expected = (self.x.nrows(), self.dim.1);

        if d.dim() != expected {
            return Err(MlErr::SizeMismatch {
                what: "dense delta",
                got: d.len(),
                expected: expected.0 * expected.1,
            });
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1.0, &self.x.t(), &d, 1.0, &mut dw);
        db += &d.sum_axis(Axis(0));

        let (w, _) = self.view_params(params)?;
        Ok(d.dot(&w.t()))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    ///
    /// # Arguments
    /// * `grad` - A gradient slice.
    ///
    /// # Returns
    /// A tuple containing the delta weights and delta biases.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        let size_err = MlErr::SizeMismatch {
            what: "dense grad",
            got: grad.len(),
            expected: self.size,
        };

        if grad.len() != self.size {
            return Err(size_err);
        }

        let (dw_raw, db_raw) = grad.split_at_mut(self.weight_size());
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw).map_err(|_| size_err.clone())?;
        let db = ArrayViewMut1::from(db_raw);
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    ///
    /// # Arguments
    /// * `params` - A slice of parameters.
    ///
    /// # Returns
    /// A tuple containing the weights and biases.
    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let size_err = MlErr::SizeMismatch {
            what: "dense params",
            got: params.len(),
            expected: self.size,
        };

        if params.len() != self.size {
            return Err(size_err);
        }

        let (w_raw, b_raw) = params.split_at(self.weight_size());
        let weights = ArrayView2::from_shape(self.dim, w_raw).map_err(|_| size_err.clone())?;
        let biases = ArrayView1::from(b_raw);
        Ok((weights, biases))
    }
}
