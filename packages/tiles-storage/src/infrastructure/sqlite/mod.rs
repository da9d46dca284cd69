//! SQLite Section Store
//!
//! File-based persistent storage using SQLite. The `course_sections` table
//! carries `UNIQUE (course, section)`, so renumbering must go through negative
//! placeholders exactly like the production database.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::domain::models::{CourseId, GeneralSectionDisplay, NewSection, Section, SectionId};
use crate::domain::ports::{SectionRepository, SectionTransaction};
use crate::{Result, StorageError};

const GENERAL_DISPLAY_OPTION: &str = "general_display";

const SECTION_COLUMNS: &str = "id, section, parent, visible, visibleold, pinned, name";

/// Connection options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqliteOptions {
    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
        }
    }
}

/// SQLite-based SectionRepository implementation
pub struct SqliteSectionStore {
    conn: Connection,
}

impl SqliteSectionStore {
    /// Create a new SQLite store at the given path
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(db_path, SqliteOptions::default())
    }

    pub fn with_options(db_path: impl AsRef<Path>, options: SqliteOptions) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS course_sections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course INTEGER NOT NULL,
                section INTEGER NOT NULL,
                parent INTEGER NOT NULL DEFAULT 0,
                name TEXT,
                visible BOOLEAN NOT NULL DEFAULT 1,
                visibleold BOOLEAN NOT NULL DEFAULT 1,
                pinned BOOLEAN NOT NULL DEFAULT 0,
                UNIQUE (course, section)
            )",
            [],
        )?;

        // Content attached to a section goes away with it
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS section_content (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                section_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                FOREIGN KEY (section_id) REFERENCES course_sections(id) ON DELETE CASCADE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_section_content_section
             ON section_content(section_id)",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS course_format_options (
                course INTEGER NOT NULL,
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (course, name)
            )",
            [],
        )?;

        Ok(())
    }

    /// Insert rows with their ids verbatim (fixtures, imports).
    ///
    /// Rows must already satisfy the unique number constraint.
    pub fn seed(&mut self, course: CourseId, sections: &[Section]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for section in sections {
            tx.execute(
                "INSERT INTO course_sections (id, course, section, parent, name, visible, visibleold, pinned)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    section.id.0,
                    course.0,
                    section.number,
                    section.parent,
                    &section.name,
                    section.visible,
                    section.visibleold,
                    section.pinned,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Committed rows of `course`, ordered by number
    pub fn sections(&self, course: CourseId) -> Result<Vec<Section>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SECTION_COLUMNS} FROM course_sections WHERE course = ?1 ORDER BY section"
        ))?;
        let rows = stmt
            .query_map(params![course.0], map_section_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Attach an opaque content item (activity, label, ...) to a section
    pub fn add_content(
        &mut self,
        section: SectionId,
        kind: &str,
        payload: &serde_json::Value,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO section_content (section_id, kind, payload) VALUES (?1, ?2, ?3)",
            params![section.0, kind, serde_json::to_string(payload)?],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Number of content items attached to a section
    pub fn content_count(&self, section: SectionId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM section_content WHERE section_id = ?1",
            params![section.0],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl SectionRepository for SqliteSectionStore {
    type Transaction<'a> = SqliteTransaction<'a>;

    fn begin(&mut self, course: CourseId) -> Result<SqliteTransaction<'_>> {
        // IMMEDIATE takes the write lock up front: one structural writer at a time
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(SqliteTransaction {
            tx,
            course,
            writes: 0,
        })
    }
}

/// Open SQLite transaction bound to one course; rolls back on drop
pub struct SqliteTransaction<'conn> {
    tx: rusqlite::Transaction<'conn>,
    course: CourseId,
    writes: usize,
}

impl SqliteTransaction<'_> {
    fn update_one(&mut self, sql: &str, params: impl rusqlite::Params, id: SectionId) -> Result<()> {
        let changed = self.tx.execute(sql, params)?;
        if changed == 0 {
            return Err(StorageError::section_not_found(id));
        }
        self.writes += 1;
        Ok(())
    }
}

impl SectionTransaction for SqliteTransaction<'_> {
    fn course(&self) -> CourseId {
        self.course
    }

    fn load_all(&mut self) -> Result<Vec<Section>> {
        let mut stmt = self.tx.prepare(&format!(
            "SELECT {SECTION_COLUMNS} FROM course_sections WHERE course = ?1 ORDER BY section"
        ))?;
        let rows = stmt
            .query_map(params![self.course.0], map_section_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn load_general_display(&mut self) -> Result<GeneralSectionDisplay> {
        let value: Option<String> = self
            .tx
            .query_row(
                "SELECT value FROM course_format_options WHERE course = ?1 AND name = ?2",
                params![self.course.0, GENERAL_DISPLAY_OPTION],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            None => Ok(GeneralSectionDisplay::Default),
            Some(v) => GeneralSectionDisplay::parse(&v).ok_or_else(|| {
                StorageError::serialization(format!("Unknown general display marker: {}", v))
            }),
        }
    }

    fn insert_section(&mut self, section: &NewSection) -> Result<SectionId> {
        self.tx.execute(
            "INSERT INTO course_sections (course, section, parent, name, visible, visibleold, pinned)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
            params![
                self.course.0,
                section.number,
                section.parent,
                &section.name,
                section.visible,
                section.visibleold,
            ],
        )?;
        self.writes += 1;
        Ok(SectionId(self.tx.last_insert_rowid()))
    }

    fn write_number(&mut self, id: SectionId, number: i64) -> Result<()> {
        let course = self.course.0;
        self.update_one(
            "UPDATE course_sections SET section = ?1 WHERE id = ?2 AND course = ?3",
            params![number, id.0, course],
            id,
        )
    }

    fn write_parent(&mut self, id: SectionId, parent: i64) -> Result<()> {
        let course = self.course.0;
        self.update_one(
            "UPDATE course_sections SET parent = ?1 WHERE id = ?2 AND course = ?3",
            params![parent, id.0, course],
            id,
        )
    }

    fn write_visibility(&mut self, id: SectionId, visible: bool, visibleold: bool) -> Result<()> {
        let course = self.course.0;
        self.update_one(
            "UPDATE course_sections SET visible = ?1, visibleold = ?2 WHERE id = ?3 AND course = ?4",
            params![visible, visibleold, id.0, course],
            id,
        )
    }

    fn write_pinned(&mut self, id: SectionId, pinned: bool) -> Result<()> {
        let course = self.course.0;
        self.update_one(
            "UPDATE course_sections SET pinned = ?1 WHERE id = ?2 AND course = ?3",
            params![pinned, id.0, course],
            id,
        )
    }

    fn write_name(&mut self, id: SectionId, name: Option<&str>) -> Result<()> {
        let course = self.course.0;
        self.update_one(
            "UPDATE course_sections SET name = ?1 WHERE id = ?2 AND course = ?3",
            params![name, id.0, course],
            id,
        )
    }

    fn delete_section(&mut self, id: SectionId) -> Result<()> {
        let course = self.course.0;
        self.update_one(
            "DELETE FROM course_sections WHERE id = ?1 AND course = ?2",
            params![id.0, course],
            id,
        )
    }

    fn write_general_display(&mut self, display: GeneralSectionDisplay) -> Result<()> {
        self.tx.execute(
            "INSERT OR REPLACE INTO course_format_options (course, name, value)
             VALUES (?1, ?2, ?3)",
            params![self.course.0, GENERAL_DISPLAY_OPTION, display.as_str()],
        )?;
        self.writes += 1;
        Ok(())
    }

    fn commit(self) -> Result<()> {
        debug!("Committing {} writes for {} (sqlite)", self.writes, self.course);
        self.tx
            .commit()
            .map_err(|e| StorageError::transaction(format!("COMMIT failed: {}", e)).with_source(e))
    }
}

fn map_section_row(row: &rusqlite::Row) -> rusqlite::Result<Section> {
    Ok(Section {
        id: SectionId(row.get(0)?),
        number: row.get(1)?,
        parent: row.get(2)?,
        visible: row.get(3)?,
        visibleold: row.get(4)?,
        pinned: row.get(5)?,
        name: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const COURSE: CourseId = CourseId(10);

    fn store_with_three() -> SqliteSectionStore {
        let mut store = SqliteSectionStore::in_memory().unwrap();
        store
            .seed(
                COURSE,
                &[
                    Section::new(SectionId(1), 0, 0),
                    Section::new(SectionId(2), 1, 0).with_name("Intro"),
                    Section::new(SectionId(3), 2, 1),
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_load_all_ordered() {
        let mut store = store_with_three();
        let mut tx = store.begin(COURSE).unwrap();
        let rows = tx.load_all().unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].name.as_deref(), Some("Intro"));
        assert_eq!(rows[2].parent, 1);
    }

    #[test]
    fn test_unique_number_conflict() {
        let mut store = store_with_three();
        let mut tx = store.begin(COURSE).unwrap();

        let err = tx.write_number(SectionId(3), 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[test]
    fn test_rollback_on_drop() {
        let mut store = store_with_three();
        {
            let mut tx = store.begin(COURSE).unwrap();
            tx.write_visibility(SectionId(2), false, false).unwrap();
        }

        let rows = store.sections(COURSE).unwrap();
        assert!(rows[1].visible);
    }

    #[test]
    fn test_delete_cascades_content() {
        let mut store = store_with_three();
        store
            .add_content(SectionId(3), "page", &serde_json::json!({"title": "Notes"}))
            .unwrap();
        assert_eq!(store.content_count(SectionId(3)).unwrap(), 1);

        let mut tx = store.begin(COURSE).unwrap();
        tx.delete_section(SectionId(3)).unwrap();
        tx.commit().unwrap();

        assert_eq!(store.content_count(SectionId(3)).unwrap(), 0);
        assert_eq!(store.sections(COURSE).unwrap().len(), 2);
    }

    #[test]
    fn test_other_course_rows_untouched() {
        let mut store = store_with_three();
        let mut tx = store.begin(CourseId(11)).unwrap();

        assert!(tx.load_all().unwrap().is_empty());
        let err = tx.write_parent(SectionId(2), 0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_general_display_marker() {
        let mut store = store_with_three();
        let mut tx = store.begin(COURSE).unwrap();
        assert_eq!(
            tx.load_general_display().unwrap(),
            GeneralSectionDisplay::Default
        );
        tx.write_general_display(GeneralSectionDisplay::Shown).unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin(COURSE).unwrap();
        assert_eq!(
            tx.load_general_display().unwrap(),
            GeneralSectionDisplay::Shown
        );
    }
}
