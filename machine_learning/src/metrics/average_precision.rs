use ndarray::ArrayView1;

use super::{Metric, check_lengths, ranked_counts};
use crate::Result;

/// The area under the precision-recall curve, as the step-wise sum
/// `sum((R_k - R_{k-1}) * P_k)` over the distinct score thresholds.
#[derive(Debug, Default, Clone)]
pub struct AveragePrecision {
    scores: Vec<f32>,
    labels: Vec<u8>,
}

impl AveragePrecision {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Metric for AveragePrecision {
    fn update(&mut self, probs: ArrayView1<f32>, labels: ArrayView1<u8>) -> Result<()> {
        check_lengths(probs, labels)?;

        self.scores.extend(probs.iter());
        self.labels.extend(labels.iter());
        Ok(())
    }

    fn compute(&self) -> Option<f32> {
        let pos = self.labels.iter().filter(|&&y| y == 1).count();

        if pos == 0 {
            return None;
        }

        let mut ap = 0.;
        let mut prev_recall = 0.;

        for (tp, fp) in ranked_counts(&self.scores, &self.labels) {
            let precision = tp as f64 / (tp + fp) as f64;
            let recall = tp as f64 / pos as f64;

            ap += (recall - prev_recall) * precision;
            prev_recall = recall;
        }

        Some(ap as f32)
    }

    fn reset(&mut self) {
        self.scores.clear();
        self.labels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ap(probs: &[f32], labels: &[u8]) -> Option<f32> {
        let mut m = AveragePrecision::new();
        m.update(ArrayView1::from(probs), ArrayView1::from(labels))
            .unwrap();
        m.compute()
    }

    #[test]
    fn perfect_ranking_is_one() {
        assert_eq!(ap(&[0.9, 0.8, 0.1], &[1, 1, 0]), Some(1.));
    }

    #[test]
    fn misranked_positive() {
        // Thresholds 0.9, 0.8, 0.1: recall 0.5 at precision 1, then recall 1 at precision 2/3.
        let value = ap(&[0.9, 0.8, 0.1], &[1, 0, 1]).unwrap();
        assert_abs_diff_eq!(value, 0.5 + 0.5 * 2. / 3., epsilon = 1e-6);
    }

    #[test]
    fn undefined_without_positives() {
        assert_eq!(ap(&[0.3, 0.7], &[0, 0]), None);
        assert_eq!(ap(&[], &[]), None);
    }
}
