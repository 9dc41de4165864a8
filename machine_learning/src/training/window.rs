use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// What to do with the last window when the recording doesn't end on a stride boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowTail {
    /// Only full windows are emitted.
    #[default]
    Drop,
    /// Keep sliding while `end < total + stride`, truncating the last window at the end of the
    /// recording.
    Partial,
}

/// A single window of a recording, as the half-open sample range `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The fixed-size, fixed-stride windows a recording is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    total: usize,
    window: usize,
    stride: usize,
    count: usize,
}

impl WindowPlan {
    /// Creates a new `WindowPlan`.
    ///
    /// # Arguments
    /// * `total` - The length of the recording, in samples.
    /// * `window` - The length of a window, in samples.
    /// * `stride` - The offset between consecutive windows, in samples.
    /// * `tail` - The policy for the last window.
    ///
    /// # Returns
    /// A new `WindowPlan`, or `InsufficientLength` if the recording can't fill a single window.
    pub fn new(total: usize, window: usize, stride: usize, tail: WindowTail) -> Result<Self> {
        if window == 0 || stride == 0 {
            return Err(MlErr::InvalidInput("windows need a positive length and stride"));
        }

        if total < window {
            return Err(MlErr::InsufficientLength {
                got: total,
                min: window,
            });
        }

        let rest = total - window;
        let count = match tail {
            WindowTail::Drop => rest / stride + 1,
            WindowTail::Partial => rest.div_ceil(stride) + 1,
        };

        Ok(Self {
            total,
            window,
            stride,
            count,
        })
    }

    /// Returns the amount of windows.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the length of the shortest window, which is the last one.
    pub fn shortest(&self) -> usize {
        let last_start = (self.count - 1) * self.stride;
        (self.total - last_start).min(self.window)
    }

    /// Returns the windows in time order.
    pub fn iter(&self) -> impl Iterator<Item = Window> + '_ {
        (0..self.count).map(|index| {
            let start = index * self.stride;

            Window {
                index,
                start,
                end: (start + self.window).min(self.total),
            }
        })
    }
}

/// Collapses the per-sample labels of a window into one label per batch row.
///
/// A sample is "on" when its value is at least 0.5. Rows with fewer than `min_on` samples on are
/// treated as noise and labeled 0, every other row takes the max over its samples.
///
/// # Arguments
/// * `targets` - The window's labels, shaped `[batch, len]`.
/// * `min_on` - The minimum amount of samples on for a row to count as a seizure.
///
/// # Returns
/// The window labels, shaped `[batch]`, each one 0 or 1.
pub fn window_labels(targets: ArrayView2<f32>, min_on: usize) -> Array1<u8> {
    targets.map_axis(Axis(1), |row| {
        let on = row.iter().filter(|&&v| v >= 0.5).count();
        u8::from(on > 0 && on >= min_on)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    fn offsets(plan: &WindowPlan) -> Vec<(usize, usize)> {
        plan.iter().map(|w| (w.start, w.end)).collect()
    }

    #[test]
    fn five_seconds_at_ten_hertz() {
        let plan = WindowPlan::new(50, 40, 10, WindowTail::Drop).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(offsets(&plan), vec![(0, 40), (10, 50)]);
    }

    #[test]
    fn exact_window_yields_one() {
        let plan = WindowPlan::new(40, 40, 10, WindowTail::Drop).unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn whole_strides_yield_k_plus_one() {
        for tail in [WindowTail::Drop, WindowTail::Partial] {
            for k in 0..6 {
                let plan = WindowPlan::new(40 + k * 10, 40, 10, tail).unwrap();

                assert_eq!(plan.len(), k + 1);
                assert!(plan.iter().all(|w| w.len() == 40));
                assert!(plan.iter().enumerate().all(|(i, w)| w.start == i * 10));
            }
        }
    }

    #[test]
    fn short_recordings_are_rejected() {
        let err = WindowPlan::new(39, 40, 10, WindowTail::Drop).unwrap_err();
        assert_eq!(err, MlErr::InsufficientLength { got: 39, min: 40 });
    }

    #[test]
    fn ragged_tail() {
        let drop = WindowPlan::new(55, 40, 10, WindowTail::Drop).unwrap();
        assert_eq!(offsets(&drop), vec![(0, 40), (10, 50)]);

        let partial = WindowPlan::new(55, 40, 10, WindowTail::Partial).unwrap();
        assert_eq!(offsets(&partial), vec![(0, 40), (10, 50), (20, 55)]);
        assert!(partial.iter().all(|w| w.end <= 55));

        assert_eq!(drop.shortest(), 40);
        assert_eq!(partial.shortest(), 35);
        assert_eq!(WindowPlan::new(51, 40, 10, WindowTail::Partial).unwrap().shortest(), 31);
    }

    #[test]
    fn short_bursts_are_noise() {
        let mut targets = Array2::zeros((3, 40));
        // 9 samples on, below one second at 10 Hz.
        targets.row_mut(0).iter_mut().take(9).for_each(|v| *v = 1.);
        // Exactly one second on, scattered.
        targets.row_mut(1).iter_mut().step_by(4).for_each(|v| *v = 1.);

        assert_eq!(window_labels(targets.view(), 10), array![0, 1, 0]);
    }

    #[test]
    fn labels_are_binary_regardless_of_representation() {
        let targets = Array2::from_shape_fn((2, 12), |(r, _)| if r == 0 { 0.9 } else { 0.2 });
        assert_eq!(window_labels(targets.view(), 10), array![1, 0]);
    }
}
