//! The iterative gradient-matching reconstruction loop.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use grad_leak_core::{softmax_rows, DenseClassifier, DenseGrads, LeakError, Result, Scalar};

use crate::analytic::label_from_gradient_sign;
use crate::objective::GradientMatch;
use crate::optim::{Adam, AdamSlot};

/// Logit magnitude used when the label is pinned from the gradient sign.
const PINNED_LOGIT: Scalar = 12.0;

/// Configuration for the DLG attack loop.
#[derive(Clone, Debug)]
pub struct DlgConfig {
    /// Number of optimization iterations.
    pub iterations: usize,
    /// Initial Adam step size.
    pub learning_rate: f64,
    /// Per-iteration multiplicative decay applied to the step size.
    pub lr_decay: f64,
    /// Optional RNG seed for the dummy-data initialization.
    pub seed: Option<u64>,
    /// Project dummy pixels back into `[0, 1]` after every step.
    pub clamp_pixels: bool,
    /// Stop early once the match loss falls below this value.
    pub tolerance: f64,
    /// Pin the label via the bias-gradient sign for single-example batches.
    pub label_from_gradient: bool,
}

impl Default for DlgConfig {
    fn default() -> Self {
        Self {
            iterations: 3000,
            learning_rate: 0.1,
            lr_decay: 0.999,
            seed: None,
            clamp_pixels: true,
            tolerance: 1e-10,
            label_from_gradient: true,
        }
    }
}

impl DlgConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(LeakError::invalid("iterations must be positive"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(LeakError::invalid("learning_rate must be positive"));
        }
        if !self.lr_decay.is_finite() || self.lr_decay <= 0.0 || self.lr_decay > 1.0 {
            return Err(LeakError::invalid("lr_decay must be in (0, 1]"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(LeakError::invalid("tolerance must be non-negative"));
        }
        Ok(())
    }
}

/// Callback information emitted on each attack iteration.
#[derive(Clone, Debug)]
pub struct DlgProgress<'a> {
    /// Zero-based iteration.
    pub iteration: usize,
    /// Gradient-match loss at the current iteration.
    pub loss: f64,
    /// Current dummy image batch.
    pub images: &'a Array2<Scalar>,
    /// Current dummy label logits.
    pub label_logits: &'a Array2<Scalar>,
}

/// Outcome of a DLG attack run.
#[derive(Clone, Debug)]
pub struct DlgReport {
    /// Iterations actually executed.
    pub iterations_run: usize,
    /// Match loss of the final dummy batch.
    pub final_loss: f64,
    /// Lowest match loss observed.
    pub best_loss: f64,
    /// Whether the loss dropped below the configured tolerance.
    pub converged: bool,
    /// Dummy images at the lowest observed loss.
    pub images: Array2<Scalar>,
    /// Recovered label per example.
    pub labels: Vec<usize>,
    /// Soft label distributions at the lowest observed loss.
    pub label_probs: Array2<Scalar>,
}

/// The DLG attack: reconstruct a batch from its parameter gradients.
#[derive(Clone, Debug)]
pub struct DlgAttack {
    config: DlgConfig,
}

impl DlgAttack {
    /// Create an attack from a validated configuration.
    pub fn new(config: DlgConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The attack configuration.
    pub fn config(&self) -> &DlgConfig {
        &self.config
    }

    /// Run the attack without progress reporting.
    pub fn run(
        &self,
        model: &DenseClassifier,
        target: &DenseGrads,
        batch_size: usize,
    ) -> Result<DlgReport> {
        self.run_with_callback(model, target, batch_size, |_| false)
    }

    /// Run the attack, reporting every iteration to `callback`.
    ///
    /// A callback returning `true` stops the loop after the current
    /// iteration, mirroring the optimizer-callback convention used elsewhere
    /// in this workspace.
    pub fn run_with_callback(
        &self,
        model: &DenseClassifier,
        target: &DenseGrads,
        batch_size: usize,
        mut callback: impl FnMut(DlgProgress<'_>) -> bool,
    ) -> Result<DlgReport> {
        if batch_size == 0 {
            return Err(LeakError::invalid("batch_size must be positive"));
        }
        let objective = GradientMatch::new(model, target)?;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut images = Array2::from_shape_fn((batch_size, model.input_dim()), |_| {
            rng.gen::<f64>() as Scalar
        });

        // The label either stays a free variable optimized through its
        // logits, or is pinned when the gradient sign already betrays it.
        let pinned_label = if self.config.label_from_gradient && batch_size == 1 {
            label_from_gradient_sign(target)
        } else {
            None
        };
        let mut label_logits = match pinned_label {
            Some(label) => {
                let mut logits = Array2::zeros((batch_size, model.classes()));
                logits[[0, label]] = PINNED_LOGIT;
                logits
            }
            None => {
                let normal = Normal::new(0.0, 1.0)
                    .map_err(|_| LeakError::numerical("invalid logit initializer"))?;
                Array2::from_shape_fn((batch_size, model.classes()), |_| {
                    normal.sample(&mut rng) as Scalar
                })
            }
        };

        let mut adam = Adam::new(self.config.learning_rate)?;
        let mut image_slot = AdamSlot::zeros_like(&images);
        let mut logit_slot = AdamSlot::zeros_like(&label_logits);

        let mut best_loss = f64::INFINITY;
        let mut best_images = images.clone();
        let mut best_logits = label_logits.clone();
        let mut final_loss = f64::INFINITY;
        let mut iterations_run = 0;
        let mut converged = false;

        for iteration in 0..self.config.iterations {
            let eval = objective.evaluate(&images, &label_logits)?;
            if !eval.loss.is_finite() {
                return Err(LeakError::numerical(format!(
                    "gradient matching diverged at iteration {iteration}"
                )));
            }

            iterations_run = iteration + 1;
            final_loss = eval.loss;
            if eval.loss < best_loss {
                best_loss = eval.loss;
                best_images.assign(&images);
                best_logits.assign(&label_logits);
            }

            let stop = callback(DlgProgress {
                iteration,
                loss: eval.loss,
                images: &images,
                label_logits: &label_logits,
            });

            if eval.loss < self.config.tolerance {
                converged = true;
                break;
            }
            if stop {
                break;
            }

            adam.step_begin();
            adam.update(&mut images, &eval.image_grad, &mut image_slot);
            if pinned_label.is_none() {
                adam.update(&mut label_logits, &eval.logit_grad, &mut logit_slot);
            }
            adam.learning_rate *= self.config.lr_decay;

            if self.config.clamp_pixels {
                images.mapv_inplace(|p| p.clamp(0.0 as Scalar, 1.0 as Scalar));
            }
        }

        let label_probs = softmax_rows(&best_logits);
        let labels = match pinned_label {
            Some(label) => vec![label; batch_size],
            None => label_probs
                .rows()
                .into_iter()
                .map(|row| {
                    row.iter()
                        .enumerate()
                        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                        .map(|(idx, _)| idx)
                        .unwrap_or(0)
                })
                .collect(),
        };

        Ok(DlgReport {
            iterations_run,
            final_loss,
            best_loss,
            converged,
            images: best_images,
            labels,
            label_probs,
        })
    }
}
