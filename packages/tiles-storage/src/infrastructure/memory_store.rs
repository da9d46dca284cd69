//! In-Memory Section Store (for testing)
//!
//! HashMap-based implementation with the same contract as the SQLite adapter:
//! section numbers are unique per course at every write, and a transaction only
//! becomes visible on commit.
//! NOT for production use.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::models::{CourseId, GeneralSectionDisplay, NewSection, Section, SectionId};
use crate::domain::ports::{SectionRepository, SectionTransaction};
use crate::{Result, StorageError};

#[derive(Debug, Clone, Default)]
struct CourseRows {
    sections: Vec<Section>,
    general_display: GeneralSectionDisplay,
}

#[derive(Debug, Clone)]
pub struct InMemorySectionStore {
    courses: HashMap<CourseId, CourseRows>,
    next_id: i64,
    fail_after_writes: Option<usize>,
    commits: usize,
}

impl InMemorySectionStore {
    pub fn new() -> Self {
        Self {
            courses: HashMap::new(),
            next_id: 1,
            fail_after_writes: None,
            commits: 0,
        }
    }

    /// Replace the committed rows of `course` verbatim.
    ///
    /// No invariant is checked, so tests can seed corrupted layouts.
    pub fn seed(&mut self, course: CourseId, sections: Vec<Section>) {
        if let Some(max) = sections.iter().map(|s| s.id.0).max() {
            self.next_id = self.next_id.max(max + 1);
        }
        self.courses.entry(course).or_default().sections = sections;
    }

    /// Committed rows of `course`, ordered by number
    pub fn sections(&self, course: CourseId) -> Vec<Section> {
        let mut rows = self
            .courses
            .get(&course)
            .map(|c| c.sections.clone())
            .unwrap_or_default();
        rows.sort_by_key(|s| s.number);
        rows
    }

    pub fn general_display(&self, course: CourseId) -> GeneralSectionDisplay {
        self.courses
            .get(&course)
            .map(|c| c.general_display)
            .unwrap_or_default()
    }

    /// Make every write after the first `writes` of a transaction fail
    pub fn inject_failure_after(&mut self, writes: usize) {
        self.fail_after_writes = Some(writes);
    }

    pub fn clear_failure(&mut self) {
        self.fail_after_writes = None;
    }

    /// Number of committed transactions
    pub fn commit_count(&self) -> usize {
        self.commits
    }
}

impl Default for InMemorySectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionRepository for InMemorySectionStore {
    type Transaction<'a> = InMemoryTransaction<'a>;

    fn begin(&mut self, course: CourseId) -> Result<InMemoryTransaction<'_>> {
        let working = self.courses.get(&course).cloned().unwrap_or_default();
        Ok(InMemoryTransaction {
            store: self,
            course,
            working,
            writes: 0,
        })
    }
}

/// Working copy of one course; swapped into the store on commit
pub struct InMemoryTransaction<'a> {
    store: &'a mut InMemorySectionStore,
    course: CourseId,
    working: CourseRows,
    writes: usize,
}

impl InMemoryTransaction<'_> {
    fn record_write(&mut self) -> Result<()> {
        if let Some(limit) = self.store.fail_after_writes {
            if self.writes >= limit {
                return Err(StorageError::database(format!(
                    "injected failure after {} writes",
                    limit
                )));
            }
        }
        self.writes += 1;
        Ok(())
    }

    fn row_mut(&mut self, id: SectionId) -> Result<&mut Section> {
        self.working
            .sections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StorageError::section_not_found(id))
    }

    fn ensure_number_free(&self, number: i64, except: Option<SectionId>) -> Result<()> {
        let taken = self
            .working
            .sections
            .iter()
            .any(|s| s.number == number && Some(s.id) != except);
        if taken {
            return Err(StorageError::conflict(format!(
                "section number {} already used in {}",
                number, self.course
            )));
        }
        Ok(())
    }
}

impl SectionTransaction for InMemoryTransaction<'_> {
    fn course(&self) -> CourseId {
        self.course
    }

    fn load_all(&mut self) -> Result<Vec<Section>> {
        let mut rows = self.working.sections.clone();
        rows.sort_by_key(|s| s.number);
        Ok(rows)
    }

    fn load_general_display(&mut self) -> Result<GeneralSectionDisplay> {
        Ok(self.working.general_display)
    }

    fn insert_section(&mut self, section: &NewSection) -> Result<SectionId> {
        self.record_write()?;
        self.ensure_number_free(section.number, None)?;

        let id = SectionId(self.store.next_id);
        self.store.next_id += 1;

        self.working.sections.push(Section {
            id,
            number: section.number,
            parent: section.parent,
            visible: section.visible,
            visibleold: section.visibleold,
            pinned: false,
            name: section.name.clone(),
        });
        Ok(id)
    }

    fn write_number(&mut self, id: SectionId, number: i64) -> Result<()> {
        self.record_write()?;
        self.ensure_number_free(number, Some(id))?;
        self.row_mut(id)?.number = number;
        Ok(())
    }

    fn write_parent(&mut self, id: SectionId, parent: i64) -> Result<()> {
        self.record_write()?;
        self.row_mut(id)?.parent = parent;
        Ok(())
    }

    fn write_visibility(&mut self, id: SectionId, visible: bool, visibleold: bool) -> Result<()> {
        self.record_write()?;
        let row = self.row_mut(id)?;
        row.visible = visible;
        row.visibleold = visibleold;
        Ok(())
    }

    fn write_pinned(&mut self, id: SectionId, pinned: bool) -> Result<()> {
        self.record_write()?;
        self.row_mut(id)?.pinned = pinned;
        Ok(())
    }

    fn write_name(&mut self, id: SectionId, name: Option<&str>) -> Result<()> {
        self.record_write()?;
        self.row_mut(id)?.name = name.map(str::to_owned);
        Ok(())
    }

    fn delete_section(&mut self, id: SectionId) -> Result<()> {
        self.record_write()?;
        let before = self.working.sections.len();
        self.working.sections.retain(|s| s.id != id);
        if self.working.sections.len() == before {
            return Err(StorageError::section_not_found(id));
        }
        Ok(())
    }

    fn write_general_display(&mut self, display: GeneralSectionDisplay) -> Result<()> {
        self.record_write()?;
        self.working.general_display = display;
        Ok(())
    }

    fn commit(self) -> Result<()> {
        debug!(
            "Committing {} writes for {} (in-memory)",
            self.writes, self.course
        );
        self.store.courses.insert(self.course, self.working);
        self.store.commits += 1;
        Ok(())
    }
}
