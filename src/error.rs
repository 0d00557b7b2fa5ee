//! Structural errors raised while building or calculating a model.
use std::error::Error;
use std::fmt;

/// Indicates that a model could not be built or calculated.
///
/// These errors are usually wrapped in an [`anyhow::Error`]; use `downcast_ref` to inspect them.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Label sets of two tables which must correspond do not match
    Alignment(String),
    /// The matrix (I - A) cannot be inverted
    SingularMatrix {
        /// Number of sectors in A
        size: usize,
    },
}

impl ModelError {
    /// Create a new [`ModelError::Alignment`] with the given message
    pub fn alignment<S: Into<String>>(message: S) -> Self {
        Self::Alignment(message.into())
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Alignment(message) => write!(f, "Tables are not aligned: {message}"),
            Self::SingularMatrix { size } => write!(
                f,
                "The {size}x{size} matrix (I - A) is singular and cannot be inverted"
            ),
        }
    }
}

/// This is needed so that `ModelError` can be treated like standard errors are.
impl Error for ModelError {}
