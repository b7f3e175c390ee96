//! Crate-wide error taxonomy.
//!
//! Every subsystem returns `SpockResult<T>`. Variants match the semantic
//! taxonomy of the design document one-to-one; names are stable across
//! versions so callers can match on them.

use thiserror::Error;

/// Errors produced anywhere in the engine.
#[derive(Error, Debug)]
pub enum SpockError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("parse error at line {line}, column {column}: {message}")]
    ParseAt {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("circular dependency detected: {cycle}")]
    Cycle { cycle: String },

    #[error("symbol resolution error: {0}")]
    SymbolResolution(String),

    #[error("verb not found: {0}")]
    VerbNotFound(String),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("unit incompatibility: cannot combine '{left}' and '{right}'")]
    UnitIncompatibility { left: String, right: String },

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error("theory not found: {0}")]
    TheoryNotFound(String),

    #[error("theory busy: '{0}' is being written by another caller")]
    TheoryBusy(String),

    #[error("merge conflict on declaration '{0}'")]
    MergeConflict(String),

    #[error("verb macro '{0}' terminated without declaring @result")]
    MissingResult(String),

    #[error("planning failed: {reason}")]
    PlanFailure { reason: String },

    #[error("working folder unusable: {0}")]
    FolderAccess(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("figment error: {0}")]
    Figment(#[from] figment::Error),
}

/// Result alias used throughout the crate.
pub type SpockResult<T> = Result<T, SpockError>;
