use ndarray::{ArrayView1, Zip};

use super::{Metric, THRESHOLD, check_lengths};
use crate::Result;

/// The fraction of predictions that match their label.
#[derive(Debug, Default, Clone)]
pub struct BinaryAccuracy {
    correct: usize,
    total: usize,
}

impl BinaryAccuracy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Metric for BinaryAccuracy {
    fn update(&mut self, probs: ArrayView1<f32>, labels: ArrayView1<u8>) -> Result<()> {
        check_lengths(probs, labels)?;

        self.correct += Zip::from(&probs)
            .and(&labels)
            .fold(0, |acc, &p, &y| acc + usize::from((p > THRESHOLD) == (y == 1)));
        self.total += probs.len();

        Ok(())
    }

    fn compute(&self) -> Option<f32> {
        (self.total > 0).then(|| self.correct as f32 / self.total as f32)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn counts_matches_across_updates() {
        let mut acc = BinaryAccuracy::new();

        acc.update(array![0.9, 0.2].view(), array![1, 1].view()).unwrap();
        acc.update(array![0.5, 0.7].view(), array![0, 0].view()).unwrap();

        // 0.5 is not above the threshold, so it predicts the negative class.
        assert_eq!(acc.compute(), Some(0.5));
    }

    #[test]
    fn empty_is_undefined() {
        let mut acc = BinaryAccuracy::new();
        assert_eq!(acc.compute(), None);

        acc.update(array![0.9].view(), array![1].view()).unwrap();
        acc.reset();
        assert_eq!(acc.compute(), None);
    }

    #[test]
    fn mismatched_lengths_fail() {
        let mut acc = BinaryAccuracy::new();
        assert!(acc.update(array![0.9, 0.1].view(), array![1].view()).is_err());
    }
}
