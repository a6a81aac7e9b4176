//! Facade crate re-exporting the gradient-leakage toolkit.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod demo;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use grad_leak_attack as attack;
pub use grad_leak_core as core;
pub use grad_leak_data as data;

pub use grad_leak_attack::{
    label_from_gradient_sign, recover_single_input, Adam, AdamSlot, DlgAttack, DlgConfig,
    DlgProgress, DlgReport, GradientMatch, MatchEval,
};
pub use grad_leak_core::{
    cross_entropy_mean, l2_norm, log_softmax_rows, one_hot, sanitize, softmax_jvp, softmax_rows,
    squared_l2_distance, DenseClassifier, DenseGrads, LeakError, Result, Scalar,
};
pub use grad_leak_data::{save_grayscale_png, Batch, MnistData};
pub use demo::{leak_first_batch, DemoConfig, DemoOutcome};

/// Convenience prelude covering the common attack building blocks.
pub mod prelude {
    pub use crate::demo::{leak_first_batch, DemoConfig, DemoOutcome};
    pub use grad_leak_attack::prelude::*;
    pub use grad_leak_core::prelude::*;
    pub use grad_leak_data::prelude::*;
}
