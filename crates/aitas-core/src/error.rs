//! Core error types for aitas-core.
//!
//! This module defines the error hierarchy using thiserror. Pipeline
//! enrichment is best-effort: provider and parse failures are recovered
//! with neutral defaults inside the pipeline and never reach task CRUD.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for aitas-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration/settings errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reasoning-provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Pipeline stage errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Referenced record does not exist
    #[error("Record not found: {kind} '{id}'")]
    NotFound { kind: &'static str, id: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Settings/configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid value for a settings key
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required settings key
    #[error("Missing required settings key: {0}")]
    MissingKey(String),
}

/// Reasoning-provider errors. All variants are treated as transient by
/// the pipeline and degrade to neutral defaults.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP transport failure
    #[error("Request to {provider} failed: {message}")]
    RequestFailed { provider: String, message: String },

    /// Non-2xx response
    #[error("{provider} returned HTTP {status}: {body}")]
    BadStatus {
        provider: String,
        status: u16,
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("{provider} returned an unexpected response format")]
    MalformedResponse { provider: String },

    /// Per-call deadline exceeded
    #[error("{provider} timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    /// Provider is not configured (e.g. missing API key)
    #[error("{provider} is not configured: {message}")]
    NotConfigured { provider: String, message: String },

    /// Every provider in the chain failed
    #[error("All providers failed; last error: {last}")]
    AllFailed { last: String },
}

/// Pipeline stage errors. A stage error marks the task's classification
/// status `failed` and aborts the remaining stages for that run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Task disappeared mid-run (deleted by the user)
    #[error("Task '{0}' no longer exists")]
    TaskGone(String),

    /// No categories are configured, so classification cannot resolve
    #[error("No categories configured; classification requires at least a default category")]
    NoCategories,

    /// A stage failed with an underlying storage error
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: &'static str,
        #[source]
        source: Box<CoreError>,
    },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
