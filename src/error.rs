//! Error types for registry migration

use std::path::PathBuf;

use thiserror::Error;

/// Result type for migration operations
pub type Result<T> = std::result::Result<T, MigrateError>;

/// Migration errors
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Import root does not exist: {0}")]
    MissingRoot(PathBuf),

    #[error("Subject {subject} resolved from both {first} and {second}")]
    DuplicateSubject {
        subject: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Invalid context segment {segment:?}: {reason}")]
    InvalidContext { segment: String, reason: String },

    #[error("Context '{0}' already exists in the target registry")]
    ContextExists(String),

    #[error("Target registry already holds {count} subject(s); supply an import context to avoid overwriting them")]
    TargetNotEmpty { count: usize },

    #[error("Subjects already registered on target: {}", .0.join(", "))]
    SubjectsExist(Vec<String>),

    #[error("Invalid version file {path}: {reason}")]
    InvalidVersionFile { path: PathBuf, reason: String },

    #[error("Registry rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid state transition for {subject}: {from} -> {to}")]
    InvalidTransition {
        subject: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}
