//! Unified application error types for Folio.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the `?` operator. Domain failures additionally carry
//! an [`ErrorCode`] so callers can react to a specific condition without
//! matching on message text.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested resource was not found.
    NotFound,
    /// The caller is not allowed to perform the action.
    Authorization,
    /// Input validation failed.
    Validation,
    /// The request conflicts with the current state of the tree.
    Conflict,
    /// A distributed lock could not be acquired in time.
    Lock,
    /// An internal error occurred.
    Internal,
    /// A database error occurred.
    Database,
    /// A cache error occurred.
    Cache,
    /// A configuration error occurred.
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Lock => write!(f, "LOCK"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Database => write!(f, "DATABASE"),
            Self::Cache => write!(f, "CACHE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
        }
    }
}

/// Specific domain failure raised by the folder engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A folder or item id does not resolve to a live row.
    FolderNotFound,
    /// A referenced content id does not exist.
    ContentNotFound,
    /// A referenced organization does not exist.
    OrgNotFound,
    /// A sibling folder with the same name already exists.
    DuplicateName,
    /// The folder still has children.
    FolderNotEmpty,
    /// The destination is a file link, not a folder.
    NotAFolder,
    /// The declared item kind does not match the stored row.
    ItemKindMismatch,
    /// Source and destination live in different partitions.
    CrossPartitionMove,
    /// The item is the destination itself.
    MoveToSelf,
    /// The destination lies inside the moved folder's subtree.
    MoveIntoOwnDescendant,
    /// The item already sits in the destination folder.
    MoveToSameFolder,
    /// A bulk move contains a folder together with one of its descendants.
    NestedBulkItems,
    /// The operator's organization is not a headquarters.
    NotHeadquarters,
    /// A target organization lies outside the headquarters' region.
    UnsupportedRegion,
    /// The partition name is unknown.
    InvalidPartition,
    /// The owner type is unknown.
    InvalidOwnerType,
    /// A named lock was still held by another caller when the wait expired.
    LockTimeout,
}

impl ErrorCode {
    /// The error kind this code is reported under.
    pub fn kind(self) -> ErrorKind {
        match self {
            Self::FolderNotFound | Self::ContentNotFound | Self::OrgNotFound => {
                ErrorKind::NotFound
            }
            Self::DuplicateName
            | Self::FolderNotEmpty
            | Self::MoveToSelf
            | Self::MoveIntoOwnDescendant
            | Self::MoveToSameFolder => ErrorKind::Conflict,
            Self::NotAFolder
            | Self::ItemKindMismatch
            | Self::CrossPartitionMove
            | Self::NestedBulkItems
            | Self::InvalidPartition
            | Self::InvalidOwnerType => ErrorKind::Validation,
            Self::NotHeadquarters | Self::UnsupportedRegion => ErrorKind::Authorization,
            Self::LockTimeout => ErrorKind::Lock,
        }
    }
}

/// The unified application error used throughout Folio.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// The domain condition, when the error is a known engine failure.
    pub code: Option<ErrorCode>,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an error for a specific domain condition.
    pub fn coded(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            kind: code.kind(),
            code: Some(code),
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error carries the given domain code.
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == Some(code)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a folder-not-found error.
    pub fn folder_not_found(id: impl fmt::Display) -> Self {
        Self::coded(ErrorCode::FolderNotFound, format!("Folder {id} not found"))
    }

    /// Create a lock-timeout error for the given lock key.
    pub fn lock_timeout(key: &str) -> Self {
        Self::coded(
            ErrorCode::LockTimeout,
            format!("Timed out waiting for lock '{key}'"),
        )
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            code: self.code,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
