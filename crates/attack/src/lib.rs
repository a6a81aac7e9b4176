//! Deep Leakage from Gradients (DLG) reconstruction attack.
//!
//! Given the gradients a dense softmax classifier produced on a private
//! batch, this crate recovers the batch by optimizing dummy inputs and dummy
//! label logits until their gradients match the observed ones.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analytic;
pub mod dlg;
pub mod objective;
pub mod optim;

pub use analytic::{label_from_gradient_sign, recover_single_input};
pub use dlg::{DlgAttack, DlgConfig, DlgProgress, DlgReport};
pub use objective::{GradientMatch, MatchEval};
pub use optim::{Adam, AdamSlot};

/// Common imports for downstream users.
pub mod prelude {
    pub use crate::{
        label_from_gradient_sign, recover_single_input, Adam, AdamSlot, DlgAttack, DlgConfig,
        DlgProgress, DlgReport, GradientMatch, MatchEval,
    };
}
