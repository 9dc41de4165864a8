use log::warn;
use ndarray::ArrayView1;

use super::{Metric, check_lengths, ranked_counts};
use crate::Result;

/// The area under the ROC curve, computed exactly with the trapezoidal rule.
///
/// Tied scores move the curve diagonally. If only one class has been seen the area is undefined;
/// in that case a warning is logged and 0 is returned.
#[derive(Debug, Default, Clone)]
pub struct BinaryAuroc {
    scores: Vec<f32>,
    labels: Vec<u8>,
}

impl BinaryAuroc {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Metric for BinaryAuroc {
    fn update(&mut self, probs: ArrayView1<f32>, labels: ArrayView1<u8>) -> Result<()> {
        check_lengths(probs, labels)?;

        self.scores.extend(probs.iter());
        self.labels.extend(labels.iter());
        Ok(())
    }

    fn compute(&self) -> Option<f32> {
        if self.scores.is_empty() {
            return None;
        }

        let pos = self.labels.iter().filter(|&&y| y == 1).count();
        let neg = self.labels.len() - pos;

        if pos == 0 || neg == 0 {
            warn!(pos = pos, neg = neg; "auroc is undefined for a single class, returning 0");
            return Some(0.);
        }

        let mut area = 0.;
        let (mut prev_tp, mut prev_fp) = (0, 0);

        for (tp, fp) in ranked_counts(&self.scores, &self.labels) {
            area += (fp - prev_fp) as f64 * (tp + prev_tp) as f64 / 2.;
            (prev_tp, prev_fp) = (tp, fp);
        }

        Some((area / (pos * neg) as f64) as f32)
    }

    fn reset(&mut self) {
        self.scores.clear();
        self.labels.clear();
    }
}
