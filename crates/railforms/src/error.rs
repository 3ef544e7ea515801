//! Error types for railforms.
//!
//! This module defines all error types used throughout the railforms crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::forms::ValidationError;

/// The main error type for railforms operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
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

    /// The database has never been migrated.
    #[error("database at {path} has no schema; run `railforms migrate` first")]
    SchemaNotInitialized {
        /// Path to the database file.
        path: PathBuf,
    },

    /// The database schema is at a different version than this build expects.
    #[error("database schema is at version {found}, expected {expected}; run `railforms migrate`")]
    SchemaVersionMismatch {
        /// Version recorded in the database.
        found: i32,
        /// Version this build understands.
        expected: i32,
    },

    /// A stored row could not be decoded.
    #[error("corrupt record {id}: {message}")]
    CorruptRecord {
        /// Identifier of the offending row.
        id: i64,
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

    // === Record Errors ===
    /// A payload failed form schema validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A record with the same form number already exists for this kind.
    #[error("{kind} with form number '{form_number}' already exists")]
    Conflict {
        /// The form kind.
        kind: String,
        /// The duplicated business key.
        form_number: String,
    },

    /// No record with the given id exists for this kind.
    #[error("{kind} {id} not found")]
    NotFound {
        /// The form kind.
        kind: String,
        /// The requested id.
        id: i64,
    },

    /// The form kind is not registered.
    #[error("unknown form kind '{0}'")]
    UnknownFormKind(String),

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
}

/// A specialized Result type for railforms operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a conflict error for a duplicated form number.
    #[must_use]
    pub fn conflict(kind: impl Into<String>, form_number: impl Into<String>) -> Self {
        Self::Conflict {
            kind: kind.into(),
            form_number: form_number.into(),
        }
    }

    /// Create a not-found error for a record id.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, id: i64) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id,
        }
    }

    /// Check if this error is a duplicate business key.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if this error reports a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is a payload validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
