use std::{env, fs};

use machine_learning::telemetry::RecordingSink;
use seizure_detection::{RunConfig, SyntheticEeg, generate_rng, train};

fn config() -> RunConfig {
    serde_json::from_str(
        r#"{
            "seed": 11,
            "trainer": {
                "sample_rate": 8,
                "lr_init": 0.005,
                "batch_size": 2,
                "epochs": 2,
                "steps_per_epoch": 6
            },
            "model": {
                "in_channels": 2,
                "convs": [{ "filters": 3, "kernel": 5 }, { "filters": 3, "kernel": 3 }]
            },
            "data": {
                "recording_secs": 6,
                "train_batches": 2,
                "val_batches": 1,
                "test_batches": 2,
                "seizure_prob": 0.5
            }
        }"#,
    )
    .unwrap()
}

#[test]
fn fits_and_tests_on_synthetic_recordings() {
    let config = config();
    let mut rng = generate_rng(config.seed);
    let eeg = SyntheticEeg::from_config(&config).unwrap();
    let batch = config.trainer.batch_size;

    let train_set = eeg.recordings(2, batch, &mut rng).unwrap();
    let val_set = eeg.recordings(1, batch, &mut rng).unwrap();
    let test_set = eeg.recordings(2, batch, &mut rng).unwrap();

    let mut session = train(&config, &mut rng, RecordingSink::new()).unwrap();
    let initial = session.trainer().params().to_vec();

    let epochs = session.fit(&train_set, &val_set).unwrap();
    assert_eq!(epochs.len(), 2);
    assert!(epochs.iter().all(|e| e.train_loss.is_finite()));
    assert!(epochs.iter().all(|e| e.val_loss.is_some()));

    // 3 windows per batch, 2 batches per epoch, 2 epochs.
    assert_eq!(session.trainer().scheduler().step_num(), 12);
    assert_ne!(session.trainer().params(), initial.as_slice());

    let summary = session.test(&test_set).unwrap();
    assert_eq!(summary.steps, 2);
    assert_eq!(summary.pred0_count + summary.pred1_count, 2 * 3 * batch);

    let sink = session.sink();
    assert_eq!(sink.values("train_loss_step").len(), 4);
    assert_eq!(sink.values("val_loss_step").len(), 2);
    assert_eq!(sink.values("test_loss_step").len(), 2);
    assert_eq!(sink.last("auc_avg"), summary.auc_avg);
}

#[test]
fn same_seed_same_parameters() {
    let config = config();

    let a = train(&config, &mut generate_rng(Some(3)), RecordingSink::new()).unwrap();
    let b = train(&config, &mut generate_rng(Some(3)), RecordingSink::new()).unwrap();

    assert_eq!(a.into_params(), b.into_params());
}

#[test]
fn loads_the_bundled_config() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/synthetic.json");
    let config = RunConfig::from_path(path).unwrap();

    assert_eq!(config.steps_per_epoch().unwrap(), config.trainer.steps_per_epoch);
}

#[test]
fn invalid_files_are_reported() {
    let path = env::temp_dir().join("seizure-detection-invalid-config.json");
    fs::write(&path, r#"{ "trainer": {} }"#).unwrap();

    let err = RunConfig::from_path(&path).unwrap_err();
    assert!(err.to_string().contains("invalid run config"));

    fs::remove_file(path).ok();
}
