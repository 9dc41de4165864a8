use super::{TrainerConfig, WindowedTrainer};
use crate::{
    Result,
    arch::Model,
    optimization::{Adam, LrScheduler, OneCycleCosine},
};

/// Builds the optimizer and the learning rate schedule of a training run.
///
/// Adam starts at `lr_init` with the configured weight decay. The schedule peaks at
/// `lr_init * sqrt(batch_size)` and starts at `peak / sqrt(batch_size)`, i.e. at `lr_init`.
///
/// # Arguments
/// * `config` - The trainer's configuration.
/// * `len` - The amount of parameters to optimize.
///
/// # Returns
/// The optimizer and its scheduler, or an error if the configuration is invalid.
pub fn configure_optimizers(config: &TrainerConfig, len: usize) -> Result<(Adam, OneCycleCosine)> {
    config.validate()?;

    let scale = (config.batch_size as f32).sqrt();
    let scheduler = OneCycleCosine::new(
        config.lr_init * scale,
        config.epochs,
        config.steps_per_epoch,
        scale,
    )?;

    let (beta1, beta2) = config.betas;
    let optimizer = Adam::new(len, scheduler.learning_rate(), beta1, beta2, config.eps)
        .with_weight_decay(config.weight_decay);

    Ok((optimizer, scheduler))
}

/// Builds `WindowedTrainer`s given a configuration.
#[derive(Debug, Clone)]
pub struct TrainerBuilder {
    config: TrainerConfig,
}

impl TrainerBuilder {
    /// Creates a new `TrainerBuilder`.
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Builds a new `WindowedTrainer` with an Adam optimizer and a one cycle schedule.
    ///
    /// # Arguments
    /// * `model` - The model to train.
    /// * `params` - The model's initial parameters.
    ///
    /// # Returns
    /// The trainer, or an error if the configuration is invalid or the parameters don't fit
    /// the model.
    pub fn build<M: Model>(
        &self,
        model: M,
        params: Vec<f32>,
    ) -> Result<WindowedTrainer<M, Adam, OneCycleCosine>> {
        let (optimizer, scheduler) = configure_optimizers(&self.config, model.size())?;
        WindowedTrainer::new(model, params, optimizer, scheduler, self.config.clone())
    }
}
