//! Error types for filestash.

use thiserror::Error;

/// Common error type for filestash.
#[derive(Error, Debug)]
pub enum StashError {
    /// Database error.
    ///
    /// Wraps errors from the sqlx backend. Uniqueness violations are
    /// translated to [`StashError::Conflict`] by the repositories before
    /// they reach this variant.
    #[error("database error: {0}")]
    Database(String),

    /// Storage I/O error (disk write, read, or delete failure).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No credentials, or the presented token was not accepted.
    #[error("authentication required")]
    AuthenticationRequired,

    /// The authenticated account has been deactivated.
    #[error("account is inactive")]
    AccountInactive,

    /// Valid identity, insufficient rights.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Uniqueness violation (email or username).
    #[error("{0}")]
    Conflict(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Malformed or incomplete request (no file, nothing to update).
    #[error("{0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Upload exceeded the configured ceiling.
    #[error("payload too large (limit {limit} bytes)")]
    PayloadTooLarge {
        /// Configured ceiling in bytes.
        limit: u64,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for StashError {
    fn from(e: sqlx::Error) -> Self {
        StashError::Database(e.to_string())
    }
}

/// Result type alias for filestash operations.
pub type Result<T> = std::result::Result<T, StashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_display() {
        let err = StashError::Forbidden("not the owner".to_string());
        assert_eq!(err.to_string(), "forbidden: not the owner");
    }

    #[test]
    fn test_not_found_display() {
        let err = StashError::NotFound("file".to_string());
        assert_eq!(err.to_string(), "file not found");
    }

    #[test]
    fn test_payload_too_large_display() {
        let err = StashError::PayloadTooLarge { limit: 1024 };
        assert_eq!(err.to_string(), "payload too large (limit 1024 bytes)");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: StashError = io_err.into();
        assert!(matches!(err, StashError::Io(_)));
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: StashError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StashError::Database(_)));
    }
}
