//! Error types for ideaboard.

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Result type alias using ideaboard's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ideaboard operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or missing input, rejected before touching the store
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Foreign key, uniqueness, or check constraint rejected a write
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Object store operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify a sqlx error at the repository boundary.
    ///
    /// Integrity violations become [`Error::ConstraintViolation`] and
    /// `RowNotFound` becomes [`Error::NotFound`]; anything else is kept as
    /// [`Error::Database`].
    pub fn from_db(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Error::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    let detail = match db_err.constraint() {
                        Some(constraint) => format!("{} ({})", db_err.message(), constraint),
                        None => db_err.message().to_string(),
                    };
                    Error::ConstraintViolation(detail)
                }
                _ => Error::Database(err),
            },
            _ => Error::Database(err),
        }
    }

    /// Whether this error was caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::InvalidInput(_) | Error::ConstraintViolation(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("idea 7".to_string());
        assert_eq!(err.to_string(), "Not found: idea 7");
    }

    #[test]
    fn test_error_display_constraint_violation() {
        let err = Error::ConstraintViolation("ideas_user_id_fkey".to_string());
        assert_eq!(
            err.to_string(),
            "Constraint violation: ideas_user_id_fkey"
        );
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("title must not be empty".to_string());
        assert_eq!(err.to_string(), "Invalid input: title must not be empty");
    }

    #[test]
    fn test_error_display_storage() {
        let err = Error::Storage("bucket unreachable".to_string());
        assert_eq!(err.to_string(), "Storage error: bucket unreachable");
    }

    #[test]
    fn test_from_db_row_not_found() {
        let err = Error::from_db(sqlx::Error::RowNotFound);
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_from_db_keeps_other_errors() {
        let err = Error::from_db(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, Error::Database(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::NotFound("x".into()).is_client_error());
        assert!(Error::InvalidInput("x".into()).is_client_error());
        assert!(Error::ConstraintViolation("x".into()).is_client_error());
        assert!(!Error::Storage("x".into()).is_client_error());
        assert!(!Error::Internal("x".into()).is_client_error());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.to_string().contains("Serialization error:"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
