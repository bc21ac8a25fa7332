use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy surfaced to the UI
// ---------------------------------------------------------------------------

/// Failure to turn a file path into a dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to parse Touchstone file {}: {message}", path.display())]
    InvalidFormat { path: PathBuf, message: String },
}

/// A parameter token such as `"S21"` that does not address this network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid parameter name {name:?}: {reason}")]
pub struct InvalidParameterError {
    pub name: String,
    pub reason: String,
}

impl InvalidParameterError {
    pub fn new(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Rejected frequency-range edit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeError {
    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("Frequency must be a finite value")]
    NotFinite,

    #[error("Frequency cannot be negative")]
    Negative,

    #[error("Min frequency must be less than Max frequency")]
    Inverted,
}
