//! Numerically stable softmax and cross-entropy primitives.

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{LeakError, Result};
use crate::tensor::Scalar;

/// Row-wise softmax with max subtraction for stability.
pub fn softmax_rows(logits: &Array2<Scalar>) -> Array2<Scalar> {
    let mut out = logits.clone();
    for mut row in out.rows_mut() {
        let max = row.iter().copied().fold(Scalar::NEG_INFINITY, Scalar::max);
        row.mapv_inplace(|z| (z - max).exp());
        let sum = row.sum();
        if sum > 0.0 as Scalar {
            row.mapv_inplace(|e| e / sum);
        }
    }
    out
}

/// Row-wise log-softmax computed in the log domain.
pub fn log_softmax_rows(logits: &Array2<Scalar>) -> Array2<Scalar> {
    let mut out = logits.clone();
    for mut row in out.rows_mut() {
        let max = row.iter().copied().fold(Scalar::NEG_INFINITY, Scalar::max);
        let log_sum = row
            .iter()
            .map(|&z| (z - max).exp())
            .sum::<Scalar>()
            .ln();
        row.mapv_inplace(|z| z - max - log_sum);
    }
    out
}

/// Encode labels as one-hot rows.
pub fn one_hot(labels: &[usize], classes: usize) -> Result<Array2<Scalar>> {
    if classes == 0 {
        return Err(LeakError::invalid("classes must be positive"));
    }
    let mut out = Array2::zeros((labels.len(), classes));
    for (n, &label) in labels.iter().enumerate() {
        if label >= classes {
            return Err(LeakError::invalid(format!(
                "label {label} out of range for {classes} classes"
            )));
        }
        out[[n, label]] = 1.0 as Scalar;
    }
    Ok(out)
}

/// Mean cross-entropy between logits and target rows.
///
/// Targets may be one-hot or soft distributions; rows are expected to sum
/// to 1.
pub fn cross_entropy_mean(logits: &Array2<Scalar>, targets: &Array2<Scalar>) -> Scalar {
    assert_eq!(
        logits.dim(),
        targets.dim(),
        "logits and targets must have the same shape"
    );
    let batch = logits.nrows();
    if batch == 0 {
        return 0.0 as Scalar;
    }

    let log_probs = log_softmax_rows(logits);
    let mut total = 0.0 as Scalar;
    for (lp, t) in log_probs.rows().into_iter().zip(targets.rows()) {
        total -= lp.dot(&t);
    }
    total / batch as Scalar
}

/// Apply the softmax Jacobian `diag(p) - p pᵀ` to a vector.
///
/// The Jacobian is symmetric, so this serves as both the JVP and the VJP.
pub fn softmax_jvp(p: ArrayView1<'_, Scalar>, v: ArrayView1<'_, Scalar>) -> Array1<Scalar> {
    assert_eq!(
        p.len(),
        v.len(),
        "probability and tangent vectors must have the same length"
    );
    let inner = p.dot(&v);
    let mut out = Array1::zeros(p.len());
    for ((o, &pi), &vi) in out.iter_mut().zip(p.iter()).zip(v.iter()) {
        *o = pi * vi - pi * inner;
    }
    out
}
