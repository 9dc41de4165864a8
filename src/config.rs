use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use machine_learning::{arch::CnnConfig, training::TrainerConfig};
use serde::{Deserialize, Serialize};

/// How the synthetic recordings of a run are generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// The length of every recording, in seconds.
    pub recording_secs: usize,
    pub train_batches: usize,
    #[serde(default)]
    pub val_batches: usize,
    #[serde(default)]
    pub test_batches: usize,
    /// The chance of a recording row containing a seizure.
    #[serde(default = "default_seizure_prob")]
    pub seizure_prob: f64,
    #[serde(default = "default_noise_std")]
    pub noise_std: f32,
}

fn default_seizure_prob() -> f64 {
    0.5
}

fn default_noise_std() -> f32 {
    1.
}

/// Everything needed to run a training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub trainer: TrainerConfig,
    pub model: CnnConfig,
    pub data: DataConfig,
    /// Seeds both the parameter initialization and the data, random when missing.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl RunConfig {
    /// Loads a `RunConfig` from a JSON file.
    ///
    /// # Errors
    /// Fails if the file can't be read, parsed or holds an invalid configuration.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read '{}'", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("invalid run config in '{}'", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks the trainer, the model and the data fit together.
    pub fn validate(&self) -> Result<()> {
        self.trainer.validate().context("invalid trainer config")?;
        self.model.validate().context("invalid model config")?;


        ensure!(
            self.data.train_batches > 0,
            "at least one training batch is needed"
        );
        ensure!(
            (0. ..=1.).contains(&self.data.seizure_prob),
            "the seizure probability must be within [0, 1]"
        );
        ensure!(
            self.data.noise_std.is_finite() && self.data.noise_std >= 0.,
            "the noise deviation can't be negative"
        );

        let plan = self
            .trainer
            .plan(self.recording_len())
            .context("recordings can't fill a single window")?;

        let window = plan.shortest();
        let field = self.model.receptive_field();
        ensure!(
            window >= field,
            "a {window} sample window is shorter than the model's receptive field of {field}"
        );

        Ok(())
    }

    /// Returns the length of every recording, in samples.
    pub fn recording_len(&self) -> usize {
        self.data.recording_secs * self.trainer.sample_rate
    }

    /// Returns the scheduler steps an epoch of this run actually takes.
    pub fn steps_per_epoch(&self) -> Result<usize> {
        let steps = self
            .trainer
            .scheduler_steps_per_epoch(self.recording_len(), self.data.train_batches)?;

        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use machine_learning::training::WindowTail;

    fn json() -> &'static str {
        r#"{
            "trainer": {
                "sample_rate": 10,
                "lr_init": 0.01,
                "batch_size": 2,
                "epochs": 1,
                "steps_per_epoch": 3
            },
            "model": { "in_channels": 2, "convs": [{ "filters": 2, "kernel": 3 }] },
            "data": { "recording_secs": 6, "train_batches": 1 }
        }"#
    }

    #[test]
    fn parses_with_defaults() {
        let config: RunConfig = serde_json::from_str(json()).unwrap();

        config.validate().unwrap();
        assert_eq!(config.seed, None);
        assert_eq!(config.data.val_batches, 0);
        assert_eq!(config.recording_len(), 60);
        assert_eq!(config.steps_per_epoch().unwrap(), 3);
    }

    #[test]
    fn windows_must_cover_the_receptive_field() {
        let mut config: RunConfig = serde_json::from_str(json()).unwrap();
        config.model.convs[0].kernel = 41;

        assert!(config.validate().is_err());
    }

    #[test]
    fn whole_second_recordings_never_truncate_the_tail() {
        let mut config: RunConfig = serde_json::from_str(json()).unwrap();
        config.trainer.tail = WindowTail::Partial;
        config.model.convs[0].kernel = 40;

        for secs in 4..10 {
            config.data.recording_secs = secs;
            let plan = config.trainer.plan(config.recording_len()).unwrap();

            assert_eq!(plan.shortest(), config.trainer.window_len());
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn recordings_must_fill_a_window() {
        let mut config: RunConfig = serde_json::from_str(json()).unwrap();
        config.data.recording_secs = 3;

        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_files_name_the_path() {
        let err = RunConfig::from_path("does/not/exist.json").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
