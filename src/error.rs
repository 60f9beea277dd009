//! Application error types.
//!
//! `AppError` covers store, source and configuration failures. Record-level
//! problems that only skip a single legacy record live in [`RecordError`].

use thiserror::Error;

/// Application-level errors for the migration pipeline.
#[derive(Error, Debug)]
pub enum AppError {
    // Target store errors
    #[error("Postgres connection error: {0}")]
    Connection(String),

    #[error("Postgres query error: {message}")]
    Query { message: String, query: String },

    // Legacy source errors
    #[error("Legacy source connection error: {0}")]
    SourceConnection(String),

    #[error("Legacy source error: {0}")]
    Source(String),

    #[error("Malformed legacy document {id}: {reason}")]
    MalformedDocument { id: String, reason: String },

    // Domain errors
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    // Report/IO errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable code used in run logs and error messages.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Connection(_) => "CONNECTION_ERROR",
            AppError::Query { .. } => "QUERY_ERROR",
            AppError::SourceConnection(_) => "SOURCE_CONNECTION_ERROR",
            AppError::Source(_) => "SOURCE_ERROR",
            AppError::MalformedDocument { .. } => "MALFORMED_DOCUMENT",
            AppError::Duplicate(_) => "DUPLICATE_RECORD",
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error must abort the whole run.
    ///
    /// Losing either store is fatal; everything else is isolated to the
    /// record that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Connection(_) | AppError::SourceConnection(_) | AppError::Source(_)
        )
    }

    /// Formats the error with its code prefix, e.g. `[QUERY_ERROR] ...`.
    pub fn coded(&self) -> String {
        format!("[{}] {}", self.code(), self)
    }
}

/// Reasons a single legacy record cannot be migrated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Invalid phone number: {0:?}")]
    InvalidPhoneFormat(String),

    #[error("{0} is required")]
    MissingRequiredField(&'static str),

    #[error("Owner {field}={old_id} has not been migrated")]
    OwnerNotMigrated { field: &'static str, old_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_are_fatal() {
        assert!(AppError::Connection("refused".into()).is_fatal());
        assert!(AppError::SourceConnection("timeout".into()).is_fatal());
        assert!(!AppError::Duplicate("+18479873207".into()).is_fatal());
        assert!(!AppError::Query {
            message: "constraint".into(),
            query: "INSERT".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_coded_message() {
        let err = AppError::Duplicate("+18479873207".into());
        assert_eq!(err.coded(), "[DUPLICATE_RECORD] Duplicate record: +18479873207");
    }

    #[test]
    fn test_record_error_messages() {
        assert_eq!(
            RecordError::MissingRequiredField("username").to_string(),
            "username is required"
        );
        assert_eq!(
            RecordError::InvalidPhoneFormat("12345".into()).to_string(),
            "Invalid phone number: \"12345\""
        );
    }
}
