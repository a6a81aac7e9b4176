//! End-to-end demo harness: one real training step, then the attack.
//!
//! This mirrors the classic DLG demonstration flow. The victim model takes a
//! single optimization-free forward/backward pass on a freshly sampled batch
//! (its parameters are never updated before the attack finishes), the target
//! images are written out for later comparison, and the captured gradients
//! are handed to the reconstruction loop.

use std::fs;
use std::path::PathBuf;

use rand::Rng;

use grad_leak_attack::{DlgAttack, DlgConfig, DlgProgress, DlgReport};
use grad_leak_core::{one_hot, squared_l2_distance, DenseClassifier, LeakError, Result, Scalar};
use grad_leak_data::{save_grayscale_png, Batch, MnistData};

/// Number of classes in the demo classifier.
pub const NUM_CLASSES: usize = 10;

/// Configuration for the attack demonstration.
#[derive(Clone, Debug)]
pub struct DemoConfig {
    /// Whether GPU execution was requested. Always rejected on this build.
    pub use_gpu: bool,
    /// Batch size of the attacked training step.
    pub batch_size: usize,
    /// Attack iterations.
    pub iterations: usize,
    /// Attack step size.
    pub learning_rate: f64,
    /// Directory for image artifacts.
    pub result_dir: PathBuf,
    /// Directory holding the MNIST IDX files.
    pub data_dir: PathBuf,
    /// Optional RNG seed for batch sampling, model init, and the attack.
    pub seed: Option<u64>,
    /// Save an intermediate reconstruction every N iterations.
    pub snapshot_every: Option<usize>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            use_gpu: false,
            batch_size: 2,
            iterations: 3000,
            learning_rate: 0.1,
            result_dir: PathBuf::from("./att_results"),
            data_dir: PathBuf::from("./data"),
            seed: None,
            snapshot_every: Some(100),
        }
    }
}

impl DemoConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.use_gpu {
            return Err(LeakError::unsupported(
                "GPU execution is not available in this CPU-only build",
            ));
        }
        if self.batch_size == 0 {
            return Err(LeakError::invalid("batch_size must be positive"));
        }
        if self.iterations == 0 {
            return Err(LeakError::invalid("iterations must be positive"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(LeakError::invalid("learning_rate must be positive"));
        }
        if self.snapshot_every == Some(0) {
            return Err(LeakError::invalid("snapshot_every must be positive"));
        }
        Ok(())
    }

    /// Derive the attack configuration.
    pub fn dlg_config(&self) -> DlgConfig {
        DlgConfig {
            iterations: self.iterations,
            learning_rate: self.learning_rate,
            seed: self.seed,
            ..DlgConfig::default()
        }
    }
}

/// Result of one demonstration run.
#[derive(Clone, Debug)]
pub struct DemoOutcome {
    /// The attacked batch.
    pub target: Batch,
    /// Training loss of the real forward pass.
    pub real_loss: Scalar,
    /// Attack report with the reconstructed batch.
    pub report: DlgReport,
    /// All image artifacts written during the run.
    pub artifacts: Vec<PathBuf>,
}

impl DemoOutcome {
    /// Mean squared pixel error between each target and its reconstruction.
    pub fn per_image_mse(&self) -> Vec<f64> {
        self.target
            .images
            .rows()
            .into_iter()
            .zip(self.report.images.rows())
            .map(|(t, r)| squared_l2_distance(&t, &r) / t.len() as f64)
            .collect()
    }
}

/// Sample one batch, leak its gradients, and reconstruct it.
///
/// Artifacts land in `config.result_dir`: `target.png` (plus `target_{i}.png`
/// for additional batch members), `result_{iter}.png` intermediate
/// reconstructions, and `recovered_{i}.png` final reconstructions.
pub fn leak_first_batch<R: Rng + ?Sized>(
    dataset: &MnistData,
    config: &DemoConfig,
    rng: &mut R,
    mut on_progress: impl FnMut(&DlgProgress<'_>),
) -> Result<DemoOutcome> {
    config.validate()?;
    fs::create_dir_all(&config.result_dir)?;

    let batch = dataset.sample_batch(config.batch_size, rng)?;
    let mut artifacts = Vec::new();
    for (i, image) in batch.images.rows().into_iter().enumerate() {
        let name = if i == 0 {
            "target.png".to_string()
        } else {
            format!("target_{i}.png")
        };
        let path = config.result_dir.join(name);
        save_grayscale_png(&path, image, dataset.rows, dataset.cols)?;
        artifacts.push(path);
    }

    let model = DenseClassifier::new(dataset.pixels(), NUM_CLASSES, rng)?;
    let targets = one_hot(&batch.labels, NUM_CLASSES)?;
    let (real_loss, grads) = model.loss_and_grads(&batch.images, &targets)?;

    let attack = DlgAttack::new(config.dlg_config())?;
    let snapshot_every = config.snapshot_every;
    let mut snapshots: Vec<PathBuf> = Vec::new();
    let mut snapshot_err: Option<LeakError> = None;

    let report = attack.run_with_callback(&model, &grads, batch.labels.len(), |progress| {
        if let Some(every) = snapshot_every {
            if progress.iteration % every == 0 {
                let path = config
                    .result_dir
                    .join(format!("result_{}.png", progress.iteration));
                match save_grayscale_png(&path, progress.images.row(0), dataset.rows, dataset.cols)
                {
                    Ok(()) => snapshots.push(path),
                    Err(e) => {
                        snapshot_err = Some(e);
                        return true;
                    }
                }
            }
        }
        on_progress(&progress);
        false
    })?;

    if let Some(e) = snapshot_err {
        return Err(e);
    }
    artifacts.extend(snapshots);

    for (i, image) in report.images.rows().into_iter().enumerate() {
        let path = config.result_dir.join(format!("recovered_{i}.png"));
        save_grayscale_png(&path, image, dataset.rows, dataset.cols)?;
        artifacts.push(path);
    }

    Ok(DemoOutcome {
        target: batch,
        real_loss,
        report,
        artifacts,
    })
}
