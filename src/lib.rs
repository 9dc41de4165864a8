pub mod config;
pub mod data;
mod session;

use anyhow::{Context, Result};
use log::{info, warn};
use machine_learning::{
    arch::SeizureCnn,
    telemetry::MetricSink,
    training::TrainerBuilder,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

pub use config::{DataConfig, RunConfig};
pub use data::SyntheticEeg;
pub use session::{EpochSummary, Session};

/// Returns a seeded random number generator, or one seeded by the OS when there's no seed.
pub fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Builds a training session for a freshly initialized `SeizureCnn`.
///
/// # Arguments
/// * `config` - The run's configuration.
/// * `rng` - Draws the initial parameters.
/// * `sink` - Where every step is reported to.
///
/// # Errors
/// Fails if the configuration is invalid.
pub fn train<R, K>(config: &RunConfig, rng: &mut R, sink: K) -> Result<Session<SeizureCnn, K>>
where
    R: Rng + ?Sized,
    K: MetricSink,
{
    config.validate()?;

    let steps = config.steps_per_epoch()?;
    if steps != config.trainer.steps_per_epoch {
        warn!(
            configured = config.trainer.steps_per_epoch,
            actual = steps;
            "the learning rate cycle doesn't match the windows per epoch"
        );
    }

    let model = SeizureCnn::new(&config.model).context("invalid model config")?;
    let params = model.init_params(rng)?;
    info!(params = params.len(); "initialized model");

    let trainer = TrainerBuilder::new(config.trainer.clone())
        .build(model, params)
        .context("cannot build the trainer")?;

    Ok(Session::new(trainer, sink))
}
