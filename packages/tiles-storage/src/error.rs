//! Storage errors
//!
//! One struct for every adapter: a coarse [`ErrorKind`] the hierarchy engine
//! can branch on, a human-readable message and the underlying driver error.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Driver or connection failure
    Database,
    /// Stored value could not be decoded or encoded
    Serialization,
    /// A write would break `UNIQUE (course, section)`
    Conflict,
    /// Row addressed by id does not exist in the course
    NotFound,
    /// Commit failed; nothing was persisted
    Transaction,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Database => "database",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Transaction => "transaction",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the driver error that caused this one
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn section_not_found(section: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("no row for {}", section))
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transaction, message)
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StorageError::conflict(format!("constraint violated: {}", err)).with_source(err)
            }
            _ => StorageError::database(format!("sqlite: {}", err)).with_source(err),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(format!("content payload: {}", err)).with_source(err)
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_carries_kind_tag() {
        let err = StorageError::section_not_found("section#42");
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.to_string(), "[not_found] no row for section#42");

        let err = StorageError::conflict("number 3 already used in course#7");
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "[conflict] number 3 already used in course#7");
    }

    #[test]
    fn test_source_chain() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only file");
        let err = StorageError::transaction("COMMIT failed").with_source(io_err);

        assert!(!err.is_conflict());
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("read-only file"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StorageError = json_err.into();
        assert_eq!(err.kind, ErrorKind::Serialization);
        assert!(err.source.is_some());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_rusqlite_errors() {
        let err: StorageError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.kind, ErrorKind::Database);

        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (n INTEGER UNIQUE); INSERT INTO t VALUES (1);")
            .unwrap();
        let err: StorageError = conn
            .execute("INSERT INTO t VALUES (1)", [])
            .unwrap_err()
            .into();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }
}
