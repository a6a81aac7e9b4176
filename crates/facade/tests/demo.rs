use std::path::PathBuf;

use grad_leak::{leak_first_batch, DemoConfig, LeakError, MnistData, Scalar};
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn in_memory_dataset() -> MnistData {
    MnistData {
        images: Array2::from_shape_fn((6, 12), |(n, d)| ((n * 12 + d) % 20) as Scalar / 20.0),
        labels: vec![0, 1, 2, 3, 4, 5],
        rows: 4,
        cols: 3,
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("grad-leak-demo-{}-{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn demo_writes_target_and_recovered_artifacts() {
    let dataset = in_memory_dataset();
    let config = DemoConfig {
        batch_size: 1,
        iterations: 300,
        result_dir: scratch_dir("artifacts"),
        seed: Some(11),
        snapshot_every: Some(100),
        ..DemoConfig::default()
    };

    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut progress_calls = 0usize;
    let outcome = leak_first_batch(&dataset, &config, &mut rng, |_| {
        progress_calls += 1;
    })
    .unwrap();

    assert!(progress_calls > 0);
    assert_eq!(outcome.target.labels.len(), 1);
    assert_eq!(outcome.per_image_mse().len(), 1);
    assert!(outcome.real_loss.is_finite());

    assert!(config.result_dir.join("target.png").is_file());
    assert!(config.result_dir.join("result_0.png").is_file());
    assert!(config.result_dir.join("recovered_0.png").is_file());
    for artifact in &outcome.artifacts {
        assert!(artifact.is_file(), "missing artifact {}", artifact.display());
    }
}

#[test]
fn demo_names_additional_targets_by_index() {
    let dataset = in_memory_dataset();
    let config = DemoConfig {
        batch_size: 2,
        iterations: 50,
        result_dir: scratch_dir("batch2"),
        seed: Some(13),
        snapshot_every: None,
        ..DemoConfig::default()
    };

    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let outcome = leak_first_batch(&dataset, &config, &mut rng, |_| {}).unwrap();

    assert_eq!(outcome.target.labels.len(), 2);
    assert!(config.result_dir.join("target.png").is_file());
    assert!(config.result_dir.join("target_1.png").is_file());
    assert!(config.result_dir.join("recovered_1.png").is_file());
}

#[test]
fn gpu_request_is_an_explicit_error() {
    let config = DemoConfig {
        use_gpu: true,
        ..DemoConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(err, LeakError::UnsupportedFeature { .. }));
}

#[test]
fn degenerate_configs_are_rejected() {
    let config = DemoConfig {
        batch_size: 0,
        ..DemoConfig::default()
    };
    assert!(config.validate().is_err());

    let config = DemoConfig {
        iterations: 0,
        ..DemoConfig::default()
    };
    assert!(config.validate().is_err());

    let config = DemoConfig {
        learning_rate: f64::INFINITY,
        ..DemoConfig::default()
    };
    assert!(config.validate().is_err());

    let config = DemoConfig {
        snapshot_every: Some(0),
        ..DemoConfig::default()
    };
    assert!(config.validate().is_err());
}
