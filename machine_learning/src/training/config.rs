use serde::{Deserialize, Serialize};

use super::{WindowPlan, WindowTail};
use crate::{MlErr, Result};

/// The configuration of a `WindowedTrainer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Samples per second. Windows last `window_secs` seconds and slide one second at a time.
    pub sample_rate: usize,
    pub lr_init: f32,
    pub batch_size: usize,
    pub epochs: usize,
    /// Optimizer steps per epoch, i.e. windows per batch times batches per epoch.
    pub steps_per_epoch: usize,
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f32,
    #[serde(default = "default_grad_clip_norm")]
    pub grad_clip_norm: f32,
    #[serde(default = "default_window_secs")]
    pub window_secs: usize,
    #[serde(default)]
    pub tail: WindowTail,
    #[serde(default = "default_betas")]
    pub betas: (f32, f32),
    #[serde(default = "default_eps")]
    pub eps: f32,
}

fn default_weight_decay() -> f32 {
    1e-6
}

fn default_grad_clip_norm() -> f32 {
    0.5
}

fn default_window_secs() -> usize {
    4
}

fn default_betas() -> (f32, f32) {
    (0.9, 0.999)
}

fn default_eps() -> f32 {
    1e-8
}

impl TrainerConfig {
    /// Creates a new `TrainerConfig` with the default optimization hyperparameters.
    ///
    /// # Arguments
    /// * `sample_rate` - Samples per second of the recordings.
    /// * `lr_init` - The initial learning rate.
    /// * `batch_size` - The amount of recordings per batch.
    /// * `epochs` - The amount of epochs the learning rate cycle spans.
    /// * `steps_per_epoch` - The amount of optimizer steps per epoch.
    pub fn new(
        sample_rate: usize,
        lr_init: f32,
        batch_size: usize,
        epochs: usize,
        steps_per_epoch: usize,
    ) -> Self {
        Self {
            sample_rate,
            lr_init,
            batch_size,
            epochs,
            steps_per_epoch,
            weight_decay: default_weight_decay(),
            grad_clip_norm: default_grad_clip_norm(),
            window_secs: default_window_secs(),
            tail: WindowTail::default(),
            betas: default_betas(),
            eps: default_eps(),
        }
    }

    /// Checks every value is in its domain.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 || self.window_secs == 0 {
            return Err(MlErr::InvalidInput("the sample rate and window length must be positive"));
        }

        if self.batch_size == 0 {
            return Err(MlErr::InvalidInput("the batch size must be positive"));
        }

        if self.epochs == 0 || self.steps_per_epoch == 0 {
            return Err(MlErr::InvalidInput("the trainer needs at least one step"));
        }

        if !(self.lr_init.is_finite() && self.lr_init > 0.) {
            return Err(MlErr::InvalidInput("the learning rate must be positive"));
        }

        if !(self.grad_clip_norm.is_finite() && self.grad_clip_norm > 0.) {
            return Err(MlErr::InvalidInput("the gradient clip norm must be positive"));
        }

        if !(self.weight_decay.is_finite() && self.weight_decay >= 0.) {
            return Err(MlErr::InvalidInput("the weight decay can't be negative"));
        }

        let (beta1, beta2) = self.betas;
        if !((0. ..1.).contains(&beta1) && (0. ..1.).contains(&beta2)) {
            return Err(MlErr::InvalidInput("the betas must be within [0, 1)"));
        }

        if !(self.eps.is_finite() && self.eps > 0.) {
            return Err(MlErr::InvalidInput("epsilon must be positive"));
        }

        Ok(())
    }

    /// Returns the length of a window, in samples.
    pub fn window_len(&self) -> usize {
        self.window_secs * self.sample_rate
    }

    /// Returns the offset between consecutive windows, in samples.
    pub fn stride(&self) -> usize {
        self.sample_rate
    }

    /// Plans the windows of a recording of length `total`.
    pub fn plan(&self, total: usize) -> Result<WindowPlan> {
        WindowPlan::new(total, self.window_len(), self.stride(), self.tail)
    }

    /// Computes the scheduler steps one epoch takes, since the scheduler advances once per window.
    ///
    /// # Arguments
    /// * `recording_len` - The length of every recording, in samples.
    /// * `batches` - The amount of batches per epoch.
    ///
    /// # Returns
    /// The steps per epoch, or an error if a recording can't fill a single window.
    pub fn scheduler_steps_per_epoch(&self, recording_len: usize, batches: usize) -> Result<usize> {
        Ok(self.plan(recording_len)?.len() * batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_filled_in() {
        let json = r#"{
            "sample_rate": 10,
            "lr_init": 0.001,
            "batch_size": 4,
            "epochs": 2,
            "steps_per_epoch": 6
        }"#;

        let config: TrainerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config, TrainerConfig::new(10, 0.001, 4, 2, 6));
        assert_eq!(config.window_len(), 40);
        assert_eq!(config.stride(), 10);
        assert_eq!(config.grad_clip_norm, 0.5);
        assert_eq!(config.tail, WindowTail::Drop);
    }

    #[test]
    fn tail_policy_is_snake_case() {
        let json = r#"{
            "sample_rate": 10,
            "lr_init": 0.001,
            "batch_size": 4,
            "epochs": 2,
            "steps_per_epoch": 6,
            "tail": "partial"
        }"#;

        let config: TrainerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.tail, WindowTail::Partial);
    }

    #[test]
    fn steps_per_epoch_counts_windows() {
        let config = TrainerConfig::new(10, 0.001, 4, 2, 1);

        assert_eq!(config.scheduler_steps_per_epoch(60, 3).unwrap(), 9);
        assert!(config.scheduler_steps_per_epoch(39, 3).is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = TrainerConfig::new(10, 0.001, 4, 2, 6);
        assert!(config.validate().is_ok());

        config.lr_init = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = TrainerConfig::new(10, 0.001, 4, 2, 6);
        config.grad_clip_norm = 0.;
        assert!(config.validate().is_err());

        assert!(TrainerConfig::new(0, 0.001, 4, 2, 6).validate().is_err());
    }
}
