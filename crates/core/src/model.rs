//! Dense softmax classifier with closed-form gradients.
//!
//! The model is intentionally the smallest thing that leaks: one fully
//! connected layer followed by softmax cross-entropy, matching the classic
//! gradient-leakage demonstration setup.

use ndarray::{Array1, Array2, Axis};
use rand::Rng;

use crate::error::{LeakError, Result};
use crate::ops::{cross_entropy_mean, softmax_rows};
use crate::tensor::{l2_norm, squared_l2_distance, Scalar};

/// A single fully connected layer with softmax cross-entropy loss.
#[derive(Clone, Debug)]
pub struct DenseClassifier {
    /// Weight matrix of shape `(input_dim, classes)`.
    pub weight: Array2<Scalar>,
    /// Bias vector of shape `(classes,)`.
    pub bias: Array1<Scalar>,
}

/// Gradients of the loss with respect to the classifier parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseGrads {
    /// Gradient with respect to the weight matrix.
    pub weight: Array2<Scalar>,
    /// Gradient with respect to the bias vector.
    pub bias: Array1<Scalar>,
}

impl DenseClassifier {
    /// Create a classifier with Xavier-uniform weights and zero bias.
    pub fn new<R: Rng + ?Sized>(input_dim: usize, classes: usize, rng: &mut R) -> Result<Self> {
        if input_dim == 0 {
            return Err(LeakError::invalid("input_dim must be positive"));
        }
        if classes == 0 {
            return Err(LeakError::invalid("classes must be positive"));
        }

        let limit = (6.0 / (input_dim + classes) as f64).sqrt();
        let weight =
            Array2::from_shape_fn((input_dim, classes), |_| rng.gen_range(-limit..limit) as Scalar);
        let bias = Array1::zeros(classes);
        Ok(Self { weight, bias })
    }

    /// Build a classifier from existing parameters.
    pub fn from_parts(weight: Array2<Scalar>, bias: Array1<Scalar>) -> Result<Self> {
        if weight.ncols() != bias.len() {
            return Err(LeakError::shape(
                format!("bias of length {}", weight.ncols()),
                format!("bias of length {}", bias.len()),
            ));
        }
        if weight.nrows() == 0 || weight.ncols() == 0 {
            return Err(LeakError::invalid("parameters must be non-empty"));
        }
        Ok(Self { weight, bias })
    }

    /// Input dimensionality accepted by the layer.
    pub fn input_dim(&self) -> usize {
        self.weight.nrows()
    }

    /// Number of output classes.
    pub fn classes(&self) -> usize {
        self.weight.ncols()
    }

    /// Raw logits for a batch of flattened inputs.
    pub fn logits(&self, images: &Array2<Scalar>) -> Result<Array2<Scalar>> {
        if images.ncols() != self.input_dim() {
            return Err(LeakError::shape(
                format!("inputs with {} features", self.input_dim()),
                format!("inputs with {} features", images.ncols()),
            ));
        }
        Ok(images.dot(&self.weight) + &self.bias)
    }

    /// Class probabilities for a batch of flattened inputs.
    pub fn forward(&self, images: &Array2<Scalar>) -> Result<Array2<Scalar>> {
        Ok(softmax_rows(&self.logits(images)?))
    }

    /// Predicted class per example.
    pub fn predict(&self, images: &Array2<Scalar>) -> Result<Vec<usize>> {
        let probs = self.forward(images)?;
        Ok(probs
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(idx, _)| idx)
                    .unwrap_or(0)
            })
            .collect())
    }

    /// Mean cross-entropy loss against one-hot or soft target rows.
    pub fn loss(&self, images: &Array2<Scalar>, targets: &Array2<Scalar>) -> Result<Scalar> {
        self.check_targets(images, targets)?;
        Ok(cross_entropy_mean(&self.logits(images)?, targets))
    }

    /// Mean loss and its closed-form parameter gradients.
    ///
    /// With probabilities `P = softmax(XW + b)` and residual `R = (P - T)/B`,
    /// the gradients are `gW = XᵀR` and `gb = Σ_n R_n`.
    pub fn loss_and_grads(
        &self,
        images: &Array2<Scalar>,
        targets: &Array2<Scalar>,
    ) -> Result<(Scalar, DenseGrads)> {
        self.check_targets(images, targets)?;

        let logits = self.logits(images)?;
        let loss = cross_entropy_mean(&logits, targets);

        let batch = images.nrows() as Scalar;
        let residual = (softmax_rows(&logits) - targets) / batch;
        let grads = DenseGrads {
            weight: images.t().dot(&residual),
            bias: residual.sum_axis(Axis(0)),
        };
        Ok((loss, grads))
    }

    fn check_targets(&self, images: &Array2<Scalar>, targets: &Array2<Scalar>) -> Result<()> {
        if images.nrows() == 0 {
            return Err(LeakError::invalid("batch must be non-empty"));
        }
        if targets.dim() != (images.nrows(), self.classes()) {
            return Err(LeakError::shape(
                format!("targets of shape ({}, {})", images.nrows(), self.classes()),
                format!("targets of shape ({}, {})", targets.nrows(), targets.ncols()),
            ));
        }
        Ok(())
    }
}

impl DenseGrads {
    /// Zero gradients with the same shapes as the given classifier.
    pub fn zeros_like(model: &DenseClassifier) -> Self {
        Self {
            weight: Array2::zeros(model.weight.raw_dim()),
            bias: Array1::zeros(model.bias.raw_dim()),
        }
    }

    /// Squared L2 distance to another gradient set.
    pub fn squared_distance(&self, other: &Self) -> f64 {
        squared_l2_distance(&self.weight, &other.weight)
            + squared_l2_distance(&self.bias, &other.bias)
    }

    /// Global L2 norm across both parameter gradients.
    pub fn global_l2_norm(&self) -> f64 {
        let w = l2_norm(&self.weight);
        let b = l2_norm(&self.bias);
        if !w.is_finite() || !b.is_finite() {
            return f64::INFINITY;
        }
        (w * w + b * b).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::one_hot;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_model(seed: u64) -> DenseClassifier {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        DenseClassifier::new(4, 3, &mut rng).unwrap()
    }

    #[test]
    fn new_rejects_degenerate_dims() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(DenseClassifier::new(0, 3, &mut rng).is_err());
        assert!(DenseClassifier::new(4, 0, &mut rng).is_err());
    }

    #[test]
    fn from_parts_checks_shapes() {
        let weight = Array2::zeros((4, 3));
        let bias = Array1::zeros(2);
        assert!(DenseClassifier::from_parts(weight, bias).is_err());
    }

    #[test]
    fn logits_reject_wrong_feature_count() {
        let model = small_model(1);
        let images = Array2::zeros((2, 5));
        assert!(model.logits(&images).is_err());
    }

    #[test]
    fn forward_rows_are_distributions() {
        let model = small_model(2);
        let images = array![[0.1, 0.2, 0.3, 0.4], [0.9, 0.0, 0.0, 0.1]];
        let probs = model.forward(&images).unwrap();
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn predict_matches_argmax_of_forward() {
        let model = small_model(3);
        let images = array![[0.5, -0.2, 0.8, 0.1], [0.0, 0.0, 0.0, 1.0]];
        let probs = model.forward(&images).unwrap();
        let preds = model.predict(&images).unwrap();
        for (pred, row) in preds.iter().zip(probs.rows()) {
            let max = row.iter().copied().fold(Scalar::NEG_INFINITY, Scalar::max);
            assert!((row[*pred] - max).abs() < 1e-12);
        }
    }

    #[test]
    fn gradients_match_finite_differences() {
        let model = small_model(4);
        let images = array![[0.2, 0.7, 0.1, 0.5], [0.9, 0.3, 0.6, 0.0]];
        let targets = one_hot(&[2, 0], 3).unwrap();

        let (_, grads) = model.loss_and_grads(&images, &targets).unwrap();

        let eps = 1e-5;
        for d in 0..model.input_dim() {
            for c in 0..model.classes() {
                let mut plus = model.clone();
                plus.weight[[d, c]] += eps;
                let mut minus = model.clone();
                minus.weight[[d, c]] -= eps;
                let fd = (plus.loss(&images, &targets).unwrap()
                    - minus.loss(&images, &targets).unwrap())
                    / (2.0 * eps);
                assert!(
                    (grads.weight[[d, c]] - fd).abs() < 1e-6,
                    "weight grad ({d},{c}): analytic {} vs finite-diff {fd}",
                    grads.weight[[d, c]]
                );
            }
        }

        for c in 0..model.classes() {
            let mut plus = model.clone();
            plus.bias[c] += eps;
            let mut minus = model.clone();
            minus.bias[c] -= eps;
            let fd = (plus.loss(&images, &targets).unwrap()
                - minus.loss(&images, &targets).unwrap())
                / (2.0 * eps);
            assert!(
                (grads.bias[c] - fd).abs() < 1e-6,
                "bias grad {c}: analytic {} vs finite-diff {fd}",
                grads.bias[c]
            );
        }
    }

    #[test]
    fn batch_gradient_is_mean_of_per_example_gradients() {
        let model = small_model(5);
        let images = array![[0.4, 0.1, 0.9, 0.2], [0.3, 0.8, 0.5, 0.7]];
        let targets = one_hot(&[1, 2], 3).unwrap();

        let (_, batch_grads) = model.loss_and_grads(&images, &targets).unwrap();

        let mut summed = DenseGrads::zeros_like(&model);
        for n in 0..2 {
            let image = images.row(n).to_owned().insert_axis(Axis(0));
            let target = targets.row(n).to_owned().insert_axis(Axis(0));
            let (_, g) = model.loss_and_grads(&image, &target).unwrap();
            summed.weight = summed.weight + &g.weight;
            summed.bias = summed.bias + &g.bias;
        }
        summed.weight /= 2.0 as Scalar;
        summed.bias /= 2.0 as Scalar;

        assert!(batch_grads.squared_distance(&summed) < 1e-20);
    }

    #[test]
    fn gradient_distance_to_self_is_zero() {
        let model = small_model(6);
        let images = array![[0.2, 0.4, 0.6, 0.8]];
        let targets = one_hot(&[0], 3).unwrap();
        let (_, grads) = model.loss_and_grads(&images, &targets).unwrap();
        assert_eq!(grads.squared_distance(&grads.clone()), 0.0);
        assert!(grads.global_l2_norm() > 0.0);
    }
}
