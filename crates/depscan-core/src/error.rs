//! Error types for the core crate.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the graph store, the snapshot cache and settings loading.
#[derive(Debug, Error)]
pub enum CoreError {
    /// IO error while reading or writing a snapshot.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot file exists but could not be parsed.
    #[error("Malformed snapshot at line {line}: {message}")]
    MalformedSnapshot { line: usize, message: String },

    /// The settings file could not be parsed.
    #[error("Invalid settings file: {0}")]
    SettingsFile(#[from] toml::de::Error),

    /// A settings value is out of range or unparsable.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreError {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedSnapshot {
            line,
            message: message.into(),
        }
    }
}
