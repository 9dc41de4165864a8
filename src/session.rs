use anyhow::{Context, Result};
use log::info;
use machine_learning::{
    arch::Model,
    dataset::Recording,
    optimization::{Adam, OneCycleCosine},
    telemetry::MetricSink,
    training::{TestSummary, WindowedTrainer},
};

/// The losses of a finished epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    pub epoch: usize,
    pub train_loss: f32,
    /// `None` when there were no validation batches.
    pub val_loss: Option<f32>,
}

/// Drives a `WindowedTrainer` through whole epochs, one step per batch.
pub struct Session<M: Model, K: MetricSink> {
    trainer: WindowedTrainer<M, Adam, OneCycleCosine>,
    sink: K,
}

impl<M: Model, K: MetricSink> Session<M, K> {
    /// Creates a new `Session`.
    ///
    /// # Arguments
    /// * `trainer` - The trainer to drive.
    /// * `sink` - Where every step is reported to.
    pub fn new(trainer: WindowedTrainer<M, Adam, OneCycleCosine>, sink: K) -> Self {
        Self { trainer, sink }
    }

    /// Trains for the configured amount of epochs, validating after each one.
    ///
    /// # Arguments
    /// * `train` - The training batches.
    /// * `val` - The validation batches, may be empty.
    ///
    /// # Errors
    /// Fails on the first batch whose pass fails, the session shouldn't be trained further.
    pub fn fit(&mut self, train: &[Recording], val: &[Recording]) -> Result<Vec<EpochSummary>> {
        let epochs = self.trainer.config().epochs;
        let mut summaries = Vec::with_capacity(epochs);

        for epoch in 0..epochs {
            let mut train_losses = Vec::with_capacity(train.len());

            for (i, rec) in train.iter().enumerate() {
                let report = self
                    .trainer
                    .training_step(rec.inputs(), rec.targets(), &mut self.sink)
                    .with_context(|| format!("training batch {i} of epoch {epoch} failed"))?;

                train_losses.push(report.loss);
            }

            let mut val_losses = Vec::with_capacity(val.len());

            for (i, rec) in val.iter().enumerate() {
                let report = self
                    .trainer
                    .validation_step(rec.inputs(), rec.targets(), &mut self.sink)
                    .with_context(|| format!("validation batch {i} of epoch {epoch} failed"))?;

                val_losses.push(report.loss);
            }

            let summary = EpochSummary {
                epoch,
                train_loss: mean(&train_losses).unwrap_or(f32::NAN),
                val_loss: mean(&val_losses),
            };

            info!(
                epoch = epoch,
                train_loss = summary.train_loss;
                "epoch finished, val loss {:?}", summary.val_loss
            );

            summaries.push(summary);
        }

        Ok(summaries)
    }

    /// Runs the whole test phase.
    ///
    /// # Errors
    /// Fails on the first batch whose pass fails.
    pub fn test(&mut self, test: &[Recording]) -> Result<TestSummary> {
        for (i, rec) in test.iter().enumerate() {
            self.trainer
                .test_step(rec.inputs(), rec.targets(), &mut self.sink)
                .with_context(|| format!("test batch {i} failed"))?;
        }

        Ok(self.trainer.on_test_phase_end(&mut self.sink))
    }

    pub fn trainer(&self) -> &WindowedTrainer<M, Adam, OneCycleCosine> {
        &self.trainer
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Ends the session, returning the trained parameters.
    pub fn into_params(self) -> Vec<f32> {
        self.trainer.into_params()
    }
}

fn mean(values: &[f32]) -> Option<f32> {
    (!values.is_empty()).then(|| values.iter().sum::<f32>() / values.len() as f32)
}
