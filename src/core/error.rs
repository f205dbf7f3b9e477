//! Grid error types
//!
//! Structural failures of a store call. Validation failures are NOT errors:
//! they are data recorded in the error index (see `schema::ViolationKind`).
//!
//! Every structural error leaves the published snapshot untouched.

use std::fmt;

use thiserror::Error;

use super::ids::RowId;

/// Result type for grid operations
pub type GridResult<T> = Result<T, GridError>;

/// How a caller is expected to react to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller attempted a disallowed change; surface it and carry on
    Recoverable,
    /// Programmer or configuration error
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Recoverable => write!(f, "RECOVERABLE"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Grid error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// Field name does not resolve in the registry
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Column is already part of the column set
    #[error("Column already present: {0}")]
    DuplicateColumn(String),

    /// Attempt to remove, add or rewrite a Misc field
    #[error("Field is protected: {0}")]
    ProtectedField(String),

    /// No row carries the given identifier
    #[error("Row not found: {0}")]
    RowNotFound(RowId),

    /// Load required a non-empty dataset
    #[error("Dataset is empty")]
    EmptyDataset,

    /// Two rows of one load share an identifier
    #[error("Duplicate row identifier: {0}")]
    DuplicateRow(RowId),

    /// A raw row carries no usable `ID`
    #[error("Row at position {0} has no valid ID")]
    MissingRowId(usize),

    /// A row's key set does not match the column set
    #[error("Row {row} does not match the column set: {reason}")]
    ColumnMismatch { row: RowId, reason: String },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed registry definition
    #[error("Registry error: {0}")]
    Registry(String),

    /// Ingestion adapter failed as a whole
    #[error("Ingestion error: {0}")]
    Ingestion(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GridError {
    /// Create an unknown field error
    pub fn unknown_field(name: impl Into<String>) -> Self {
        Self::UnknownField(name.into())
    }

    /// Create a protected field error
    pub fn protected_field(name: impl Into<String>) -> Self {
        Self::ProtectedField(name.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownField(_) => "GRID_UNKNOWN_FIELD",
            Self::DuplicateColumn(_) => "GRID_DUPLICATE_COLUMN",
            Self::ProtectedField(_) => "GRID_PROTECTED_FIELD",
            Self::RowNotFound(_) => "GRID_ROW_NOT_FOUND",
            Self::EmptyDataset => "GRID_EMPTY_DATASET",
            Self::DuplicateRow(_) => "GRID_DUPLICATE_ROW",
            Self::MissingRowId(_) => "GRID_MISSING_ROW_ID",
            Self::ColumnMismatch { .. } => "GRID_COLUMN_MISMATCH",
            Self::Config(_) => "GRID_CONFIG_ERROR",
            Self::Registry(_) => "GRID_REGISTRY_ERROR",
            Self::Ingestion(_) => "GRID_INGESTION_ERROR",
            Self::Internal(_) => "GRID_INTERNAL_ERROR",
        }
    }

    /// Severity for this error
    pub fn severity(&self) -> Severity {
        match self {
            Self::DuplicateColumn(_)
            | Self::ProtectedField(_)
            | Self::RowNotFound(_)
            | Self::EmptyDataset
            | Self::DuplicateRow(_)
            | Self::MissingRowId(_)
            | Self::ColumnMismatch { .. }
            | Self::Ingestion(_) => Severity::Recoverable,
            Self::UnknownField(_) | Self::Config(_) | Self::Registry(_) | Self::Internal(_) => {
                Severity::Fatal
            }
        }
    }

    /// Returns whether the caller can surface this error and continue
    pub fn is_recoverable(&self) -> bool {
        self.severity() == Severity::Recoverable
    }
}

impl From<serde_json::Error> for GridError {
    fn from(e: serde_json::Error) -> Self {
        Self::Ingestion(e.to_string())
    }
}
