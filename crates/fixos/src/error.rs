//! Error types for fixos.
//!
//! This module defines all error types used throughout the fixos crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for fixos operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Local Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Remote Mirror Errors ===
    /// Cloud mode is requested but no remote store is configured.
    #[error("cloud database is not configured")]
    RemoteNotConfigured,

    /// A remote database operation failed.
    #[error("remote database error: {0}")]
    Remote(#[from] sqlx::Error),

    /// A remote row could not be mapped to a document.
    #[error("remote row in '{table}' is malformed: {message}")]
    RemoteRow {
        /// Table the row came from.
        table: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === HTTP Errors ===
    /// An outbound HTTP call failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// An HTTP API answered with something we could not use.
    #[error("{service} API error: {message}")]
    Api {
        /// Name of the remote service.
        service: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Domain Errors ===
    /// Input failed a business rule.
    #[error("{0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up.
        entity: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for fixos operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not-found error for the given entity kind.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create an API error for an external service.
    #[must_use]
    pub fn api(service: &'static str, message: impl Into<String>) -> Self {
        Self::Api {
            service,
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a business-rule rejection.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error indicates a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error originated from the remote mirror.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Remote(_) | Self::RemoteRow { .. } | Self::RemoteNotConfigured
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = Error::validation("Selecione um cliente.");
        assert_eq!(err.to_string(), "Selecione um cliente.");
        assert!(err.is_validation());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("customer", "abc123");
        assert_eq!(err.to_string(), "customer not found: abc123");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_api_error_display() {
        let err = Error::api("postal code", "status 500");
        assert_eq!(err.to_string(), "postal code API error: status 500");
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_is_remote() {
        assert!(Error::RemoteNotConfigured.is_remote());
        assert!(Error::RemoteRow {
            table: "orders",
            message: "bad".to_string()
        }
        .is_remote());
        assert!(!Error::validation("x").is_remote());
    }

    #[test]
    fn test_remote_row_display() {
        let err = Error::RemoteRow {
            table: "orders",
            message: "column total missing".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("orders"));
        assert!(msg.contains("column total missing"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "missing database_url".to_string(),
        };
        assert!(err.to_string().contains("missing database_url"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
