//! Section Store Port (Trait Interface)
//!
//! Port/Adapter pattern for backend flexibility:
//! - SQLite (persistent, enforces unique section numbers)
//! - InMemory (fast unit tests, same uniqueness rule)
//!
//! Every read and write happens through a [`SectionTransaction`] obtained from
//! [`SectionRepository::begin`]. Dropping a transaction without calling
//! [`SectionTransaction::commit`] rolls it back.

use super::models::{CourseId, GeneralSectionDisplay, NewSection, Section, SectionId};
use crate::Result;

/// Section Store Port (Primary Interface)
pub trait SectionRepository {
    /// Transaction handle scoped to one course
    type Transaction<'a>: SectionTransaction
    where
        Self: 'a;

    /// Open a transaction on `course`
    fn begin(&mut self, course: CourseId) -> Result<Self::Transaction<'_>>;
}

/// Operations available inside one course transaction
pub trait SectionTransaction {
    /// Course this transaction is bound to
    fn course(&self) -> CourseId;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Reads
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// All section rows of the course, ordered by number
    fn load_all(&mut self) -> Result<Vec<Section>>;

    /// General section display marker
    fn load_general_display(&mut self) -> Result<GeneralSectionDisplay>;

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Writes
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Insert a new row and return its freshly assigned id
    ///
    /// # Errors
    ///
    /// `ErrorKind::Conflict` if `section.number` is already taken.
    fn insert_section(&mut self, section: &NewSection) -> Result<SectionId>;

    /// Overwrite the number of a row
    ///
    /// Negative numbers are placeholders used while renumbering.
    ///
    /// # Errors
    ///
    /// `ErrorKind::Conflict` if another row of the course holds `number`.
    fn write_number(&mut self, id: SectionId, number: i64) -> Result<()>;

    /// Overwrite the parent number of a row
    fn write_parent(&mut self, id: SectionId, parent: i64) -> Result<()>;

    fn write_visibility(&mut self, id: SectionId, visible: bool, visibleold: bool) -> Result<()>;

    fn write_pinned(&mut self, id: SectionId, pinned: bool) -> Result<()>;

    fn write_name(&mut self, id: SectionId, name: Option<&str>) -> Result<()>;

    /// Delete a row together with its attached content
    fn delete_section(&mut self, id: SectionId) -> Result<()>;

    fn write_general_display(&mut self, display: GeneralSectionDisplay) -> Result<()>;

    /// Make every write of this transaction durable
    fn commit(self) -> Result<()>
    where
        Self: Sized;
}

/// Authorization check for structural edits
pub trait Authorizer {
    fn can_edit(&self, course: CourseId) -> bool;
}

/// Hook notified after a structural change commits
pub trait CacheInvalidator {
    fn invalidate(&self, course: CourseId);
}

/// Authorizer granting every request
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn can_edit(&self, _course: CourseId) -> bool {
        true
    }
}

/// Invalidator that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl CacheInvalidator for NoCache {
    fn invalidate(&self, _course: CourseId) {}
}
