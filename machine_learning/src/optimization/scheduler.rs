use std::f64::consts::PI;

use crate::{MlErr, Result};

/// A learning rate schedule advanced once per optimizer step.
pub trait LrScheduler {
    /// Returns the current learning rate.
    fn learning_rate(&self) -> f32;

    /// Moves the schedule one step forward.
    ///
    /// # Returns
    /// The learning rate for the next optimizer step.
    fn advance(&mut self) -> f32;
}

/// A single cycle schedule: cosine warm up from `max_lr / div_factor` to `max_lr`, followed by a
/// cosine anneal down to `max_lr / div_factor / FINAL_DIV_FACTOR`.
///
/// Once the cycle is over the learning rate stays at its minimum.
#[derive(Debug, Clone)]
pub struct OneCycleCosine {
    initial_lr: f64,
    max_lr: f64,
    min_lr: f64,
    warmup_end: f64,
    last_step: f64,
    total_steps: usize,
    step_num: usize,
    lr: f32,
}

impl OneCycleCosine {
    /// The fraction of the cycle spent warming up.
    pub const PCT_START: f64 = 0.3;
    /// The ratio between the initial and the final learning rate.
    pub const FINAL_DIV_FACTOR: f64 = 1e4;

    /// Creates a new `OneCycleCosine`.
    ///
    /// # Arguments
    /// * `max_lr` - The peak learning rate.
    /// * `epochs` - The amount of epochs the cycle spans.
    /// * `steps_per_epoch` - The amount of optimizer steps per epoch.
    /// * `div_factor` - The ratio between the peak and the initial learning rate.
    ///
    /// # Returns
    /// A new `OneCycleCosine` or an error if the cycle is empty or a rate isn't positive.
    pub fn new(max_lr: f32, epochs: usize, steps_per_epoch: usize, div_factor: f32) -> Result<Self> {
        let total_steps = epochs * steps_per_epoch;

        if total_steps == 0 {
            return Err(MlErr::InvalidInput("the learning rate cycle has no steps"));
        }

        if !(max_lr.is_finite() && max_lr > 0.) {
            return Err(MlErr::InvalidInput("the peak learning rate must be positive"));
        }

        if !(div_factor.is_finite() && div_factor > 0.) {
            return Err(MlErr::InvalidInput("the div factor must be positive"));
        }

        let max_lr = max_lr as f64;
        let initial_lr = max_lr / div_factor as f64;

        Ok(Self {
            initial_lr,
            max_lr,
            min_lr: initial_lr / Self::FINAL_DIV_FACTOR,
            warmup_end: Self::PCT_START * total_steps as f64 - 1.,
            last_step: total_steps as f64 - 1.,
            total_steps,
            step_num: 0,
            lr: initial_lr as f32,
        })
    }

    pub fn initial_lr(&self) -> f32 {
        self.initial_lr as f32
    }

    pub fn max_lr(&self) -> f32 {
        self.max_lr as f32
    }

    pub fn min_lr(&self) -> f32 {
        self.min_lr as f32
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Returns the amount of steps taken so far.
    pub fn step_num(&self) -> usize {
        self.step_num
    }

    fn lr_at(&self, step: usize) -> f64 {
        let step = step as f64;

        if self.warmup_end > 0. && step <= self.warmup_end {
            return cos_anneal(self.initial_lr, self.max_lr, step / self.warmup_end);
        }

        let start = self.warmup_end.max(0.);
        let span = self.last_step - start;
        let pct = if span > 0. { (step - start) / span } else { 1. };

        cos_anneal(self.max_lr, self.min_lr, pct.clamp(0., 1.))
    }
}

fn cos_anneal(start: f64, end: f64, pct: f64) -> f64 {
    end + (start - end) / 2. * (1. + (PI * pct).cos())
}

impl LrScheduler for OneCycleCosine {
    fn learning_rate(&self) -> f32 {
        self.lr
    }

    fn advance(&mut self) -> f32 {
        self.step_num += 1;
        self.lr = self.lr_at(self.step_num) as f32;
        self.lr
    }
}
