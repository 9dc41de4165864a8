use ndarray::{prelude::*, s};

use crate::{MlErr, Result, arch::activations::ActFn};

/// A one dimensional convolution over `[batch, channels, time]` inputs.
///
/// Valid padding, stride one. The parameters are laid out as the weights,
/// shaped `[out_channels, in_channels, kernel]`, followed by one bias per output channel.
#[derive(Clone, Debug)]
pub struct Conv1d {
    in_channels: usize,
    out_channels: usize,
    kernel: usize,
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Array3<f32>,
    z: Array3<f32>,
}

impl Conv1d {
    /// Creates a new `Conv1d`.
    ///
    /// # Arguments
    /// * `in_channels` - The amount of channels of the input.
    /// * `out_channels` - The amount of filters, i.e. channels of the output.
    /// * `kernel` - The width of each filter, in samples.
    /// * `act_fn` - An optional activation applied to the output.
    ///
    /// # Returns
    /// A new `Conv1d` instance.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        act_fn: Option<ActFn>,
    ) -> Self {
        let empty = Array3::zeros((0, 0, 0));

        Self {
            in_channels,
            out_channels,
            kernel,
            act_fn,
            size: (in_channels * kernel + 1) * out_channels,
            x: empty.clone(),
            z: empty,
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the amount of weights this layer has, biases excluded.
    pub fn weight_size(&self) -> usize {
        self.size - self.out_channels
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn kernel(&self) -> usize {
        self.kernel
    }

    /// Makes a forward pass through the layer.
    ///
    /// # Arguments
    /// * `params` - This layer's parameter slice.
    /// * `x` - The input, shaped `[batch, in_channels, len]`.
    ///
    /// # Returns
    /// The activations, shaped `[batch, out_channels, len - kernel + 1]`.
    pub fn forward(&mut self, params: &[f32], x: ArrayView3<f32>) -> Result<Array3<f32>> {
        let (batch, channels, len) = x.dim();

        if channels != self.in_channels {
            return Err(MlErr::SizeMismatch {
                what: "conv input channels",
                got: channels,
                expected: self.in_channels,
            });
        }

        let out_len = match (len + 1).checked_sub(self.kernel) {
            Some(out_len) if out_len > 0 => out_len,
            _ => {
                return Err(MlErr::SizeMismatch {
                    what: "conv input length",
                    got: len,
                    expected: self.kernel,
                });
            }
        };

        let (w, b) = self.view_params(params)?;
        let mut z = Array3::zeros((batch, self.out_channels, out_len));

        for (mut z_b, x_b) in z.outer_iter_mut().zip(x.outer_iter()) {
            for j in 0..self.kernel {
                let w_j = w.index_axis(Axis(2), j);
                let x_j = x_b.slice(s![.., j..j + out_len]);
                z_b += &w_j.dot(&x_j);
            }

            z_b += &b.insert_axis(Axis(1));
        }

        self.x = x.to_owned();

        let a = match &self.act_fn {
            Some(act_fn) => act_fn.activate(&z),
            None => z.clone(),
        };

        self.z = z;
        Ok(a)
    }

    /// Backpropagates `d`, the derivative of the loss with respect to this layer's output.
    ///
    /// The weight and bias derivatives are **accumulated** onto `grad`.
    ///
    /// # Arguments
    /// * `params` - This layer's parameter slice.
    /// * `grad` - This layer's gradient slice.
    /// * `d` - The output delta, shaped like the last forward output.
    ///
    /// # Returns
    /// The delta with respect to the input of the last forward pass.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: Array3<f32>,
    ) -> Result<Array3<f32>> {
        if d.dim() != self.z.dim() {
            return Err(MlErr::SizeMismatch {
                what: "conv delta",
                got: d.len(),
                expected: self.z.len(),
            });
        }

        if let Some(act_fn) = &self.act_fn {
            act_fn.chain(&mut d, &self.z);
        }

        let out_len = self.z.len_of(Axis(2));
        let (w, _) = self.view_params(params)?;
        let (mut dw, mut db) = self.view_grad(grad)?;
        let mut dx = Array3::zeros(self.x.dim());

        for ((d_b, x_b), mut dx_b) in d
            .outer_iter()
            .zip(self.x.outer_iter())
            .zip(dx.outer_iter_mut())
        {
            db += &d_b.sum_axis(Axis(1));

            for j in 0..self.kernel {
                let x_j = x_b.slice(s![.., j..j + out_len]);
                let mut dw_j = dw.index_axis_mut(Axis(2), j);
                dw_j += &d_b.dot(&x_j.t());

                let w_j = w.index_axis(Axis(2), j);
                let mut dx_j = dx_b.slice_mut(s![.., j..j + out_len]);
                dx_j += &w_j.t().dot(&d_b);
            }
        }

        Ok(dx)
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView3<'a, f32>, ArrayView1<'a, f32>)> {
        let size_err = MlErr::SizeMismatch {
            what: "conv params",
            got: params.len(),
            expected: self.size,
        };

        if params.len() != self.size {
            return Err(size_err);
        }

        let (w_raw, b_raw) = params.split_at(self.weight_size());
        let shape = (self.out_channels, self.in_channels, self.kernel);
        let w = ArrayView3::from_shape(shape, w_raw).map_err(|_| size_err.clone())?;
        let b = ArrayView1::from(b_raw);
        Ok((w, b))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut3<'a, f32>, ArrayViewMut1<'a, f32>)> {
        let size_err = MlErr::SizeMismatch {
            what: "conv grad",
            got: grad.len(),
            expected: self.size,
        };

        if grad.len() != self.size {
            return Err(size_err);
        }

        let (dw_raw, db_raw) = grad.split_at_mut(self.weight_size());
        let shape = (self.out_channels, self.in_channels, self.kernel);
        let dw = ArrayViewMut3::from_shape(shape, dw_raw).map_err(|_| size_err.clone())?;
        let db = ArrayViewMut1::from(db_raw);
        Ok((dw, db))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn forward_is_a_cross_correlation() {
        let mut conv = Conv1d::new(1, 1, 2, None);
        // w = [1, -1], b = 0.5
        let params = [1., -1., 0.5];
        let x = array![[[1., 3., 6., 10.]]];

        let y = conv.forward(&params, x.view()).unwrap();

        assert_eq!(y, array![[[-1.5, -2.5, -3.5]]]);
    }

    #[test]
    fn too_short_input_fails() {
        let mut conv = Conv1d::new(1, 1, 5, None);
        let params = vec![0.; conv.size()];
        let x = Array3::zeros((1, 1, 4));

        assert!(conv.forward(&params, x.view()).is_err());
    }

    #[test]
    fn wrong_channel_count_fails() {
        let mut conv = Conv1d::new(2, 1, 1, None);
        let params = vec![0.; conv.size()];
        let x = Array3::zeros((1, 3, 4));

        let err = conv.forward(&params, x.view()).unwrap_err();
        assert_eq!(
            err,
            MlErr::SizeMismatch {
                what: "conv input channels",
                got: 3,
                expected: 2
            }
        );
    }

    #[test]
    fn backward_matches_finite_differences() {
        let mut conv = Conv1d::new(2, 2, 3, Some(ActFn::sigmoid(1.)));
        let params: Vec<f32> = (0..conv.size()).map(|i| (i as f32 * 0.37).sin() * 0.5).collect();
        let x = Array3::from_shape_fn((2, 2, 6), |(b, c, t)| ((b + 2 * c + 3 * t) as f32).cos());

        // loss = sum of the outputs, so the output delta is all ones.
        let y = conv.forward(&params, x.view()).unwrap();
        let mut grad = vec![0.; conv.size()];
        conv.backward(&params, &mut grad, Array3::ones(y.dim())).unwrap();

        let eps = 1e-3;
        for i in 0..params.len() {
            let mut plus = params.clone();
            plus[i] += eps;
            let mut minus = params.clone();
            minus[i] -= eps;

            let lp = conv.forward(&plus, x.view()).unwrap().sum();
            let lm = conv.forward(&minus, x.view()).unwrap().sum();

            assert_abs_diff_eq!(grad[i], (lp - lm) / (2. * eps), epsilon = 1e-2);
        }
    }
}
