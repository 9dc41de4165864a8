use std::env;

use anyhow::Result;
use log::info;
use machine_learning::telemetry::LogSink;
use seizure_detection::{RunConfig, SyntheticEeg, generate_rng, train};

const DEFAULT_CONFIG: &str = "configs/synthetic.json";

fn main() -> Result<()> {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    let config = RunConfig::from_path(&path)?;
    info!("loaded run config from {path}");

    let mut rng = generate_rng(config.seed);
    let eeg = SyntheticEeg::from_config(&config)?;
    let batch = config.trainer.batch_size;

    let train_set = eeg.recordings(config.data.train_batches, batch, &mut rng)?;
    let val_set = eeg.recordings(config.data.val_batches, batch, &mut rng)?;
    let test_set = eeg.recordings(config.data.test_batches, batch, &mut rng)?;

    let mut session = train(&config, &mut rng, LogSink)?;

    for epoch in session.fit(&train_set, &val_set)? {
        println!(
            "epoch {}: train loss {:.4}, val loss {:?}",
            epoch.epoch, epoch.train_loss, epoch.val_loss
        );
    }

    let summary = session.test(&test_set)?;
    println!(
        "test: {} negative and {} positive predictions, mean auroc {:?}",
        summary.pred0_count, summary.pred1_count, summary.auc_avg
    );

    Ok(())
}
