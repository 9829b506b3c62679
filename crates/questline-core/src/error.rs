//! Core error types for questline-core.
//!
//! The engine taxonomy lives in [`SessionError`]; storage and configuration
//! failures have their own enums and everything folds into [`CoreError`].

use std::path::PathBuf;
use thiserror::Error;

use crate::session::SessionPhase;

/// Core error type for questline-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session engine rejections
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Activity module failures
    #[error("Activity error: {0}")]
    Activity(#[from] crate::activities::ActivityError),

    /// The collaborator worker went away before replying
    #[error("Collaborator unavailable: {0}")]
    Collaborator(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Engine operations, used to name the call an error rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Start,
    Pause,
    Resume,
    Advance,
    RecordSuccessRate,
    AwardToken,
    ClaimReward,
    End,
    Attempt,
    Success,
    Complete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Start => "start",
            Operation::Pause => "pause",
            Operation::Resume => "resume",
            Operation::Advance => "advance",
            Operation::RecordSuccessRate => "record_success_rate",
            Operation::AwardToken => "award_token",
            Operation::ClaimReward => "claim_reward",
            Operation::End => "end",
            Operation::Attempt => "on_attempt",
            Operation::Success => "on_success",
            Operation::Complete => "on_complete",
        };
        f.write_str(name)
    }
}

/// Rejections raised by the session engine and its ledger.
///
/// Every rejection leaves the engine exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Operation is not valid in the current lifecycle phase
    #[error("cannot {operation} while session is {phase}")]
    State {
        operation: Operation,
        phase: SessionPhase,
    },

    /// Out-of-range numeric input
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Empty or malformed activity sequence
    #[error("invalid session configuration: {0}")]
    Configuration(String),

    /// Activity index out of bounds
    #[error("activity index {index} out of bounds (length: {len})")]
    Index { index: usize, len: usize },
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Value outside its allowed range
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
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

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
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

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        CoreError::Session(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
