use thiserror::Error;
use tiles_storage::{CourseId, ErrorKind, SectionId, StorageError};

use crate::config::ConfigError;
use crate::renumber::RenumberError;
use crate::tree::TreeError;
use crate::validator::MoveRejection;
use crate::visibility::VisibilityError;

pub type Result<T> = std::result::Result<T, HierarchyError>;

/// Resource whose limit was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    PinnedSections,
    Sections,
}

impl Capacity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capacity::PinnedSections => "pinned sections",
            Capacity::Sections => "sections",
        }
    }
}

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum HierarchyError {
    #[error("Invalid move: {0}")]
    InvalidMove(#[from] MoveRejection),

    #[error("Section not found: {0}")]
    NotFound(SectionId),

    #[error("Capacity exceeded: at most {limit} {what}")]
    CapacityExceeded { what: Capacity, limit: usize },

    #[error("Not allowed to edit {0}")]
    Unauthorized(CourseId),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl HierarchyError {
    pub fn invalid_operation<E: std::fmt::Display>(e: E) -> Self {
        Self::InvalidOperation(e.to_string())
    }

    pub fn integrity<E: std::fmt::Display>(e: E) -> Self {
        Self::Integrity(e.to_string())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidMove(_)
            | Self::NotFound(_)
            | Self::CapacityExceeded { .. }
            | Self::Unauthorized(_)
            | Self::InvalidOperation(_) => ErrorCategory::Declined,
            Self::StorageConflict(_)
            | Self::Integrity(_)
            | Self::Storage(_)
            | Self::Config(_) => ErrorCategory::Internal,
        }
    }

    /// Request refused before any write; the course is unchanged
    pub fn is_declined(&self) -> bool {
        self.category() == ErrorCategory::Declined
    }
}

impl From<StorageError> for HierarchyError {
    fn from(err: StorageError) -> Self {
        match err.kind {
            ErrorKind::Conflict => Self::StorageConflict(err.message),
            _ => Self::Storage(err),
        }
    }
}

impl From<TreeError> for HierarchyError {
    fn from(err: TreeError) -> Self {
        Self::integrity(err)
    }
}

impl From<RenumberError> for HierarchyError {
    fn from(err: RenumberError) -> Self {
        Self::integrity(err)
    }
}

impl From<VisibilityError> for HierarchyError {
    fn from(err: VisibilityError) -> Self {
        match err {
            VisibilityError::UnknownSection(id) => Self::NotFound(id),
            other => Self::invalid_operation(other),
        }
    }
}

/// Coarse classification for callers deciding how to report a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    /// Caller error (bad reference, limit reached, not permitted)
    Declined,
    /// Storage or data failure; the transaction was rolled back
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Declined => "declined",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
