use ndarray::ArrayView1;

use super::{AveragePrecision, BinaryAccuracy, BinaryAuroc, Metric};
use crate::Result;

/// The running accumulators of a single phase.
#[derive(Debug, Default, Clone)]
pub struct PhaseMetrics {
    pub accuracy: BinaryAccuracy,
    pub auroc: BinaryAuroc,
    pub average_precision: AveragePrecision,
}

/// The values of a phase's accumulators at some point in time.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub accuracy: Option<f32>,
    pub auroc: Option<f32>,
    pub average_precision: Option<f32>,
}

impl PhaseMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds every accumulator with the same predictions.
    pub fn update(&mut self, probs: ArrayView1<f32>, labels: ArrayView1<u8>) -> Result<()> {
        self.accuracy.update(probs, labels)?;
        self.auroc.update(probs, labels)?;
        self.average_precision.update(probs, labels)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            accuracy: self.accuracy.compute(),
            auroc: self.auroc.compute(),
            average_precision: self.average_precision.compute(),
        }
    }

    pub fn reset(&mut self) {
        self.accuracy.reset();
        self.auroc.reset();
        self.average_precision.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn snapshot_then_reset() {
        let mut metrics = PhaseMetrics::new();
        metrics
            .update(array![0.8, 0.3].view(), array![1, 0].view())
            .unwrap();

        let snap = metrics.snapshot();
        assert_eq!(snap.accuracy, Some(1.));
        assert_eq!(snap.auroc, Some(1.));
        assert_eq!(snap.average_precision, Some(1.));

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
