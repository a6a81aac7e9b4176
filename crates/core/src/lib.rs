//! Core primitives for gradient-leakage experiments.
//!
//! This crate provides the pieces shared by the attack and the demo harness:
//! a dense softmax classifier with closed-form gradients, numerically stable
//! softmax/cross-entropy helpers, and the common error type.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod model;
pub mod ops;
pub mod tensor;

pub use error::{LeakError, Result};
pub use model::{DenseClassifier, DenseGrads};
pub use ops::{cross_entropy_mean, log_softmax_rows, one_hot, softmax_jvp, softmax_rows};
pub use tensor::{l2_norm, sanitize, squared_l2_distance, Scalar};

/// Common imports for downstream users.
pub mod prelude {
    pub use crate::{
        cross_entropy_mean, l2_norm, log_softmax_rows, one_hot, sanitize, softmax_jvp,
        softmax_rows, squared_l2_distance, DenseClassifier, DenseGrads, LeakError, Result, Scalar,
    };
}
