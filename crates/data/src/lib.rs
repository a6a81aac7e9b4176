//! Dataset loading and image artifacts for gradient-leakage demos.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod image_io;
pub mod mnist;

pub use image_io::save_grayscale_png;
pub use mnist::{Batch, MnistData};

/// Common imports for downstream users.
pub mod prelude {
    pub use crate::{save_grayscale_png, Batch, MnistData};
}
