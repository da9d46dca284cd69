//! Section Store - flat, transactional persistence for course sections
//!
//! A course's tile hierarchy is stored as one row per section: a stable `id`,
//! a dense positional `number` and the `number` of its parent. This crate owns
//! the row model, the repository port and its adapters; the hierarchy engine
//! (`tiles-hierarchy`) rebuilds the tree and decides what to write.
//!
//! ## Usage
//!
//! ```rust
//! use tiles_storage::domain::{CourseId, NewSection, SectionRepository, SectionTransaction};
//! use tiles_storage::InMemorySectionStore;
//!
//! let mut store = InMemorySectionStore::new();
//! let mut tx = store.begin(CourseId(1)).unwrap();
//! let general = tx.insert_section(&NewSection::new(0, 0)).unwrap();
//! tx.commit().unwrap();
//!
//! assert_eq!(store.sections(CourseId(1))[0].id, general);
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{
    AllowAll, Authorizer, CacheInvalidator, CourseId, GeneralSectionDisplay, NewSection, NoCache,
    Section, SectionId, SectionRepository, SectionTransaction, GENERAL_SECTION,
};

pub use infrastructure::InMemorySectionStore;

#[cfg(feature = "sqlite")]
pub use infrastructure::{SqliteOptions, SqliteSectionStore};
