mod accuracy;
mod auroc;
mod average_precision;
mod metric;
mod phase;

pub use accuracy::BinaryAccuracy;
pub use auroc::BinaryAuroc;
pub use average_precision::AveragePrecision;
pub use metric::Metric;
pub use phase::{MetricsSnapshot, PhaseMetrics};

use ndarray::ArrayView1;

use crate::{MlErr, Result};

/// The probability above which a prediction counts as positive.
pub const THRESHOLD: f32 = 0.5;

fn check_lengths(probs: ArrayView1<f32>, labels: ArrayView1<u8>) -> Result<()> {
    if probs.len() != labels.len() {
        return Err(MlErr::SizeMismatch {
            what: "metric labels",
            got: labels.len(),
            expected: probs.len(),
        });
    }

    Ok(())
}

/// Sorts the scores in descending order and walks them grouped by distinct value.
///
/// # Returns
/// The cumulative `(true positives, false positives)` after each group of tied scores.
fn ranked_counts(scores: &[f32], labels: &[u8]) -> Vec<(usize, usize)> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut counts = Vec::new();
    let (mut tp, mut fp) = (0, 0);

    for (i, &idx) in order.iter().enumerate() {
        if labels[idx] == 1 {
            tp += 1;
        } else {
            fp += 1;
        }

        let group_ends = order
            .get(i + 1)
            .is_none_or(|&next| scores[next] != scores[idx]);

        if group_ends {
            counts.push((tp, fp));
        }
    }

    counts
}
