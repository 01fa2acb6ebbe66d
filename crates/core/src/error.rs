//! Error types for bm-core
//!
//! Provides a unified error type shared by the engine and the storage adapter.

use thiserror::Error;

/// Result type alias for bm-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for bm-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Settings file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Path does not live under the mirrored root
    #[error("Path is outside the mirrored directory: {0}")]
    OutsideRoot(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Endpoint URL error
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Error from the object store backend
    #[error("Object store error: {0}")]
    Network(String),

    /// Error from the filesystem watch backend
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether this error is the retryable local-file condition: the file is
    /// momentarily unreadable (mid-write, or exclusively locked by another
    /// process) and is expected to become readable again.
    pub fn is_transient_access(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_permission_denied_is_transient() {
        let err = Error::Io(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
        assert!(err.is_transient_access());
    }

    #[test]
    fn test_other_errors_are_not_transient() {
        let err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(!err.is_transient_access());

        let err = Error::Network("503".into());
        assert!(!err.is_transient_access());
    }

    #[test]
    fn test_error_display() {
        let err = Error::OutsideRoot("/tmp/elsewhere".into());
        assert_eq!(
            err.to_string(),
            "Path is outside the mirrored directory: /tmp/elsewhere"
        );

        let err = Error::Network("connection reset".into());
        assert_eq!(err.to_string(), "Object store error: connection reset");
    }
}
