use std::f32::consts::TAU;

use anyhow::{Context, Result, ensure};
use machine_learning::dataset::Recording;
use ndarray::{Array2, Array3, s};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Normal;

use crate::RunConfig;

/// Generates labeled multi-channel recordings: gaussian background activity, sometimes
/// interrupted by a seizure-like burst of high amplitude rhythmic activity.
#[derive(Debug, Clone)]
pub struct SyntheticEeg {
    sample_rate: usize,
    channels: usize,
    len: usize,
    seizure_prob: f64,
    noise: Normal<f32>,
}

impl SyntheticEeg {
    /// The frequency of the seizure bursts, in Hz.
    pub const BURST_HZ: f32 = 3.;
    pub const BURST_AMP: f32 = 4.;

    /// Creates a new `SyntheticEeg`.
    ///
    /// # Arguments
    /// * `sample_rate` - Samples per second.
    /// * `channels` - The amount of channels per recording.
    /// * `len` - The length of every recording, in samples.
    /// * `seizure_prob` - The chance of a recording row containing a seizure.
    /// * `noise_std` - The deviation of the background activity.
    pub fn new(
        sample_rate: usize,
        channels: usize,
        len: usize,
        seizure_prob: f64,
        noise_std: f32,
    ) -> Result<Self> {
        ensure!(
            (0. ..=1.).contains(&seizure_prob),
            "the seizure probability must be within [0, 1]"
        );
        let noise = Normal::new(0., noise_std).context("invalid noise deviation")?;

        Ok(Self {
            sample_rate,
            channels,
            len,
            seizure_prob,
            noise,
        })
    }

    /// Creates the generator matching a run's trainer and model.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        Self::new(
            config.trainer.sample_rate,
            config.model.in_channels,
            config.recording_len(),
            config.data.seizure_prob,
            config.data.noise_std,
        )
    }

    /// Draws a single recording batch.
    ///
    /// Seizures last between one second and half the recording, and every sample they span is
    /// labeled 1.
    ///
    /// # Arguments
    /// * `batch` - The amount of rows.
    /// * `rng` - A random number generator.
    pub fn recording<R: Rng + ?Sized>(&self, batch: usize, rng: &mut R) -> Result<Recording> {
        let mut inputs = Array3::random_using((batch, self.channels, self.len), self.noise, rng);
        let mut targets = Array2::zeros((batch, self.len));

        let shortest = self.sample_rate.min(self.len);
        let longest = (self.len / 2).max(shortest);

        for b in 0..batch {
            if !rng.random_bool(self.seizure_prob) {
                continue;
            }

            let duration = rng.random_range(shortest..=longest);
            let onset = rng.random_range(0..=self.len - duration);
            let span = onset..onset + duration;

            targets.slice_mut(s![b, span.clone()]).fill(1.);

            for (c, mut channel) in inputs.slice_mut(s![b, .., span]).outer_iter_mut().enumerate() {
                let phase = c as f32 * 0.3;

                for (t, x) in channel.iter_mut().enumerate() {
                    let secs = t as f32 / self.sample_rate as f32;
                    *x += Self::BURST_AMP * (TAU * Self::BURST_HZ * secs + phase).sin();
                }
            }
        }

        Recording::new(inputs, targets).context("generated an inconsistent recording")
    }

    /// Draws `count` recording batches of `batch` rows each.
    pub fn recordings<R: Rng + ?Sized>(
        &self,
        count: usize,
        batch: usize,
        rng: &mut R,
    ) -> Result<Vec<Recording>> {
        (0..count).map(|_| self.recording(batch, rng)).collect()
    }
}
