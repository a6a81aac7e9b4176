//! Closed-form leakage for single-example batches.
//!
//! For a dense layer trained with softmax cross-entropy on one example, the
//! bias gradient equals `p - e_y`, so its only negative entry marks the true
//! class. The weight-gradient column for that class is the input scaled by
//! the same residual, which recovers the input exactly by division. The
//! iterative attack exists because real setups batch examples and stack
//! layers; this shortcut is the sanity baseline for the single-example case.

use ndarray::Array1;

use grad_leak_core::{DenseGrads, Scalar};

/// Smallest residual magnitude considered usable as a divisor.
const MIN_RESIDUAL: f64 = 1e-12;

/// Read the label off the bias-gradient sign pattern.
///
/// Returns `None` when the pattern is ambiguous, which happens whenever the
/// gradients were produced by more than one example.
pub fn label_from_gradient_sign(target: &DenseGrads) -> Option<usize> {
    let mut negative = None;
    for (idx, &g) in target.bias.iter().enumerate() {
        if (g as f64) < 0.0 {
            if negative.is_some() {
                return None;
            }
            negative = Some(idx);
        }
    }
    negative
}

/// Recover a single input and its label directly from the gradients.
///
/// Returns `None` when the label is ambiguous or the residual is too small
/// to divide by.
pub fn recover_single_input(target: &DenseGrads) -> Option<(Array1<Scalar>, usize)> {
    let label = label_from_gradient_sign(target)?;
    let residual = target.bias[label];
    if (residual as f64).abs() < MIN_RESIDUAL {
        return None;
    }

    let image = target.weight.column(label).mapv(|g| g / residual);
    Some((image, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use grad_leak_core::{one_hot, DenseClassifier};
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn recovers_exact_input_and_label() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let model = DenseClassifier::new(6, 4, &mut rng).unwrap();
        let image = array![[0.9, 0.0, 0.3, 0.7, 0.2, 1.0]];
        let targets = one_hot(&[2], 4).unwrap();
        let (_, grads) = model.loss_and_grads(&image, &targets).unwrap();

        let (recovered, label) = recover_single_input(&grads).expect("recovery");
        assert_eq!(label, 2);
        for (r, t) in recovered.iter().zip(image.row(0).iter()) {
            assert!(((r - t) as f64).abs() < 1e-10, "recovered {r} vs true {t}");
        }
    }

    #[test]
    fn ambiguous_sign_pattern_yields_none() {
        let grads = DenseGrads {
            weight: ndarray::Array2::zeros((3, 3)),
            bias: array![-0.1, -0.2, 0.3],
        };
        assert_eq!(label_from_gradient_sign(&grads), None);
        assert!(recover_single_input(&grads).is_none());
    }

    #[test]
    fn all_positive_bias_gradient_yields_none() {
        let grads = DenseGrads {
            weight: ndarray::Array2::zeros((3, 3)),
            bias: array![0.1, 0.2, 0.3],
        };
        assert_eq!(label_from_gradient_sign(&grads), None);
    }

    #[test]
    fn vanishing_residual_yields_none() {
        let grads = DenseGrads {
            weight: ndarray::Array2::zeros((3, 3)),
            bias: array![0.1, -1e-15, 0.3],
        };
        assert!(recover_single_input(&grads).is_none());
    }
}
