//! Adam optimizer for the dummy-data variables.

use ndarray::{Array, Dimension};

use grad_leak_core::{LeakError, Result, Scalar};

/// Per-variable first and second moment estimates.
#[derive(Clone, Debug)]
pub struct AdamSlot<D: Dimension> {
    m: Array<Scalar, D>,
    v: Array<Scalar, D>,
}

impl<D: Dimension> AdamSlot<D> {
    /// Zero-initialized moments matching a variable's shape.
    pub fn zeros_like(param: &Array<Scalar, D>) -> Self {
        Self {
            m: Array::zeros(param.raw_dim()),
            v: Array::zeros(param.raw_dim()),
        }
    }
}

/// Adam with bias correction.
///
/// One optimizer instance drives several variables; call [`Adam::step_begin`]
/// once per iteration, then [`Adam::update`] for each variable with its slot.
#[derive(Clone, Debug)]
pub struct Adam {
    /// Step size.
    pub learning_rate: f64,
    /// Exponential decay rate for the first moment.
    pub beta1: f64,
    /// Exponential decay rate for the second moment.
    pub beta2: f64,
    /// Denominator fuzz term.
    pub epsilon: f64,
    step: u64,
}

impl Adam {
    /// Create an optimizer with the usual `beta1/beta2/epsilon` defaults.
    pub fn new(learning_rate: f64) -> Result<Self> {
        if !learning_rate.is_finite() || learning_rate <= 0.0 {
            return Err(LeakError::invalid("learning_rate must be positive"));
        }
        Ok(Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            step: 0,
        })
    }

    /// Advance the shared step counter; call once per iteration.
    pub fn step_begin(&mut self) {
        self.step += 1;
    }

    /// Steps taken so far.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Apply one bias-corrected update to a variable.
    pub fn update<D: Dimension>(
        &self,
        param: &mut Array<Scalar, D>,
        grad: &Array<Scalar, D>,
        slot: &mut AdamSlot<D>,
    ) {
        assert!(self.step > 0, "step_begin must run before update");
        assert_eq!(
            param.raw_dim(),
            grad.raw_dim(),
            "parameter and gradient shapes must match"
        );

        let b1 = self.beta1 as Scalar;
        let b2 = self.beta2 as Scalar;

        slot.m.zip_mut_with(grad, |m, &g| {
            *m = b1 * *m + (1.0 as Scalar - b1) * g;
        });
        slot.v.zip_mut_with(grad, |v, &g| {
            *v = b2 * *v + (1.0 as Scalar - b2) * g * g;
        });

        let correction1 = 1.0 - self.beta1.powi(self.step as i32);
        let correction2 = 1.0 - self.beta2.powi(self.step as i32);
        let rate = (self.learning_rate / correction1) as Scalar;
        let c2 = correction2 as Scalar;
        let eps = self.epsilon as Scalar;

        let mut update = slot.m.clone();
        update.zip_mut_with(&slot.v, |m, &v| {
            *m = rate * *m / ((v / c2).sqrt() + eps);
        });
        param.zip_mut_with(&update, |p, &u| *p -= u);
    }
}
