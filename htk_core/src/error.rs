use thiserror::Error;

/// Convenient `Result` alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HtkError>;

/// Errors produced while reading or writing HTK feature files.
///
/// Running out of rows is not an error: [`crate::Reader::read_next`] returns
/// `Ok(None)` and the [`crate::Vectors`] iterator simply ends.
#[derive(Debug, Error)]
pub enum HtkError {
    /// The underlying file or stream could not be read, written, or seeked.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Header fields are inconsistent or the header/compression table is truncated.
    #[error("invalid HTK feature file: {0}")]
    Format(String),

    /// A vector passed to the writer does not match the configured length.
    #[error("vector length must be {expected}, got {actual}")]
    Validation {
        /// Configured vector length.
        expected: usize,
        /// Length of the rejected vector.
        actual: usize,
    },

    /// An open mode other than `r`, `rb`, `w`, or `wb`.
    #[error("mode must be 'r', 'rb', 'w', or 'wb', got '{0}'")]
    InvalidMode(String),
}

impl HtkError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        HtkError::Format(msg.into())
    }

    /// Map an early EOF while reading fixed-size structures to a format error.
    pub(crate) fn truncated(what: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            HtkError::Format(format!("truncated {what}"))
        } else {
            HtkError::Io(err)
        }
    }
}
