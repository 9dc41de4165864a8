use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

use crate::{MlErr, Result};

/// A labeled, fully materialized EEG recording batch.
///
/// `inputs` has shape `[batch, channels, time]` and `targets` has shape `[batch, time]`,
/// holding one seizure label per sample.
#[derive(Debug, Clone)]
pub struct Recording {
    inputs: Array3<f32>,
    targets: Array2<f32>,
}

impl Recording {
    /// Creates a new `Recording`.
    ///
    /// # Arguments
    /// * `inputs` - The signal, shaped `[batch, channels, time]`.
    /// * `targets` - The per-sample labels, shaped `[batch, time]`.
    ///
    /// # Returns
    /// A new `Recording` or an error if the batch or time axes disagree.
    pub fn new(inputs: Array3<f32>, targets: Array2<f32>) -> Result<Self> {
        check_shapes(inputs.view(), targets.view())?;
        Ok(Self { inputs, targets })
    }

    pub fn inputs(&self) -> ArrayView3<'_, f32> {
        self.inputs.view()
    }

    pub fn targets(&self) -> ArrayView2<'_, f32> {
        self.targets.view()
    }

    /// Returns the amount of samples along the time axis.
    pub fn len(&self) -> usize {
        self.inputs.len_of(Axis(2))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn batch_size(&self) -> usize {
        self.inputs.len_of(Axis(0))
    }
}

/// Validates that a pair of inputs and targets describe the same batch and time span.
///
/// # Arguments
/// * `inputs` - The signal, shaped `[batch, channels, time]`.
/// * `targets` - The per-sample labels, shaped `[batch, time]`.
///
/// # Returns
/// An error if the batch or time axes disagree.
pub fn check_shapes(inputs: ArrayView3<f32>, targets: ArrayView2<f32>) -> Result<()> {
    let (batch, _, time) = inputs.dim();
    let (t_batch, t_time) = targets.dim();

    if t_batch != batch {
        return Err(MlErr::SizeMismatch {
            what: "targets batch",
            got: t_batch,
            expected: batch,
        });
    }

    if t_time != time {
        return Err(MlErr::SizeMismatch {
            what: "targets time",
            got: t_time,
            expected: time,
        });
    }

    Ok(())
}
