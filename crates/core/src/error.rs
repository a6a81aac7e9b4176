//! Error types shared across the workspace.

/// Errors that can occur while preparing or running a leakage attack.
#[derive(Debug, thiserror::Error)]
pub enum LeakError {
    /// Invalid parameter provided.
    #[error("invalid parameter: {msg}")]
    InvalidParameters {
        /// Human-readable error description.
        msg: String,
    },

    /// Array shapes do not line up.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Expected shape, rendered as text.
        expected: String,
        /// Actual shape, rendered as text.
        got: String,
    },

    /// Numerical computation error.
    #[error("numerical error: {msg}")]
    NumericalError {
        /// Human-readable error description.
        msg: String,
    },

    /// Unsupported feature or configuration.
    #[error("unsupported feature: {msg}")]
    UnsupportedFeature {
        /// Human-readable error description.
        msg: String,
    },

    /// Malformed dataset file.
    #[error("malformed dataset: {msg}")]
    DatasetFormat {
        /// Human-readable error description.
        msg: String,
    },

    /// Image encoding or decoding error.
    #[error("image error: {msg}")]
    Image {
        /// Human-readable error description.
        msg: String,
    },

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for leakage operations.
pub type Result<T> = std::result::Result<T, LeakError>;

impl LeakError {
    /// Create an invalid parameter error.
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameters { msg: msg.into() }
    }

    /// Create a shape mismatch error.
    pub fn shape<E: Into<String>, G: Into<String>>(expected: E, got: G) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create a numerical error.
    pub fn numerical<S: Into<String>>(msg: S) -> Self {
        Self::NumericalError { msg: msg.into() }
    }

    /// Create an unsupported feature error.
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedFeature { msg: msg.into() }
    }

    /// Create a malformed dataset error.
    pub fn dataset<S: Into<String>>(msg: S) -> Self {
        Self::DatasetFormat { msg: msg.into() }
    }

    /// Create an image error.
    pub fn image<S: Into<String>>(msg: S) -> Self {
        Self::Image { msg: msg.into() }
    }
}
