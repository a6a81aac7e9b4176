//! Gradient-matching objective with analytic gradients.
//!
//! The attack minimizes the squared distance between the gradients produced
//! by dummy data and the observed target gradients. For a dense softmax
//! classifier both the objective and its gradients with respect to the dummy
//! image batch and the dummy label logits have closed forms, so no autodiff
//! machinery is needed.

use ndarray::{Array2, Axis};

use grad_leak_core::{
    softmax_jvp, softmax_rows, DenseClassifier, DenseGrads, LeakError, Result, Scalar,
};

/// Gradient-matching objective against a fixed target gradient set.
#[derive(Clone, Debug)]
pub struct GradientMatch<'a> {
    model: &'a DenseClassifier,
    target: &'a DenseGrads,
}

/// Objective value plus gradients for one dummy-data configuration.
#[derive(Clone, Debug)]
pub struct MatchEval {
    /// Squared gradient distance.
    pub loss: f64,
    /// Gradient of the loss with respect to the dummy images.
    pub image_grad: Array2<Scalar>,
    /// Gradient of the loss with respect to the dummy label logits.
    pub logit_grad: Array2<Scalar>,
}

impl<'a> GradientMatch<'a> {
    /// Create an objective, checking that the target matches the model shape.
    pub fn new(model: &'a DenseClassifier, target: &'a DenseGrads) -> Result<Self> {
        if target.weight.dim() != model.weight.dim() || target.bias.len() != model.bias.len() {
            return Err(LeakError::shape(
                format!(
                    "gradients of shape ({}, {})",
                    model.weight.nrows(),
                    model.weight.ncols()
                ),
                format!(
                    "gradients of shape ({}, {})",
                    target.weight.nrows(),
                    target.weight.ncols()
                ),
            ));
        }
        Ok(Self { model, target })
    }

    /// Gradients the model would report for the dummy batch.
    ///
    /// Dummy labels enter through their logits: the target rows are
    /// `softmax(label_logits)`, which keeps the label search differentiable.
    pub fn dummy_grads(
        &self,
        images: &Array2<Scalar>,
        label_logits: &Array2<Scalar>,
    ) -> Result<DenseGrads> {
        let soft_targets = softmax_rows(label_logits);
        let (_, grads) = self.model.loss_and_grads(images, &soft_targets)?;
        Ok(grads)
    }

    /// Squared gradient distance for the dummy batch.
    pub fn loss(&self, images: &Array2<Scalar>, label_logits: &Array2<Scalar>) -> Result<f64> {
        Ok(self
            .dummy_grads(images, label_logits)?
            .squared_distance(self.target))
    }

    /// Objective value plus analytic gradients.
    ///
    /// With residual `R = (P - Ŷ)/B`, gradient mismatch `ΔW = XᵀR - gW*` and
    /// `δ = Σ_n R_n - gb*`, the chain rule through the two softmaxes gives
    ///
    /// ```text
    /// ∇X = 2 R ΔWᵀ + (2/B) A Wᵀ,    A_n  = J(p_n)  (ΔWᵀ x_n + δ)
    /// ∇L = -(2/B) Ay,               Ay_n = J(ŷ_n) (ΔWᵀ x_n + δ)
    /// ```
    ///
    /// where `J(p) = diag(p) - p pᵀ` is the softmax Jacobian.
    pub fn evaluate(
        &self,
        images: &Array2<Scalar>,
        label_logits: &Array2<Scalar>,
    ) -> Result<MatchEval> {
        let batch = images.nrows();
        if batch == 0 {
            return Err(LeakError::invalid("dummy batch must be non-empty"));
        }
        if label_logits.dim() != (batch, self.model.classes()) {
            return Err(LeakError::shape(
                format!("label logits of shape ({batch}, {})", self.model.classes()),
                format!(
                    "label logits of shape ({}, {})",
                    label_logits.nrows(),
                    label_logits.ncols()
                ),
            ));
        }

        let probs = softmax_rows(&self.model.logits(images)?);
        let soft_targets = softmax_rows(label_logits);
        let residual = (&probs - &soft_targets) / batch as Scalar;

        let delta_w = images.t().dot(&residual) - &self.target.weight;
        let delta_b = residual.sum_axis(Axis(0)) - &self.target.bias;

        let loss = delta_w.iter().map(|&d| (d as f64) * (d as f64)).sum::<f64>()
            + delta_b.iter().map(|&d| (d as f64) * (d as f64)).sum::<f64>();

        // M_n = ΔWᵀ x_n + δ, shared by both gradient terms.
        let mismatch = images.dot(&delta_w) + &delta_b;

        let mut probs_jvp = Array2::zeros(mismatch.raw_dim());
        let mut targets_jvp = Array2::zeros(mismatch.raw_dim());
        for n in 0..batch {
            probs_jvp
                .row_mut(n)
                .assign(&softmax_jvp(probs.row(n), mismatch.row(n)));
            targets_jvp
                .row_mut(n)
                .assign(&softmax_jvp(soft_targets.row(n), mismatch.row(n)));
        }

        let scale = (2.0 / batch as f64) as Scalar;
        let image_grad =
            residual.dot(&delta_w.t()) * (2.0 as Scalar) + probs_jvp.dot(&self.model.weight.t()) * scale;
        let logit_grad = targets_jvp * (-scale);

        Ok(MatchEval {
            loss,
            image_grad,
            logit_grad,
        })
    }
}
