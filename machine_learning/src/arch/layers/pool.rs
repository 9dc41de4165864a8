use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

use crate::{MlErr, Result};

/// Averages every feature map over the time axis: `[batch, features, len]` into `[batch, features]`.
#[derive(Clone, Debug, Default)]
pub struct GlobalAvgPool {
    len: usize,
}

impl GlobalAvgPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(&mut self, x: ArrayView3<f32>) -> Result<Array2<f32>> {
        let pooled = x.mean_axis(Axis(2)).ok_or(MlErr::SizeMismatch {
            what: "pooled length",
            got: 0,
            expected: 1,
        })?;

        self.len = x.len_of(Axis(2));
        Ok(pooled)
    }

    /// Spreads `d` evenly over the time span of the last forward pass.
    pub fn backward(&self, d: ArrayView2<f32>) -> Array3<f32> {
        let (batch, features) = d.dim();
        let scale = 1. / self.len as f32;

        Array3::from_shape_fn((batch, features, self.len), |(b, f, _)| d[[b, f]] * scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn forward_then_backward() {
        let mut pool = GlobalAvgPool::new();
        let x = array![[[1., 2., 3., 6.], [0., 0., 4., 4.]]];

        assert_eq!(pool.forward(x.view()).unwrap(), array![[3., 2.]]);
        assert_eq!(
            pool.backward(array![[4., 8.]].view()),
            array![[[1., 1., 1., 1.], [2., 2., 2., 2.]]]
        );
    }

    #[test]
    fn empty_time_axis_fails() {
        let mut pool = GlobalAvgPool::new();

        assert!(pool.forward(Array3::zeros((1, 2, 0)).view()).is_err());
    }
}
