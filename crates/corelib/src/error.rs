//! Error types for the core library.

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The digest primitive failed for a key.
    #[error("Hashing failed for key {key:?}: {reason}")]
    Hashing { key: String, reason: String },
    /// Invalid node configuration
    #[error("Invalid node: {0}")]
    InvalidNode(String),
}

impl Error {
    pub fn hashing(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Hashing {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
