//! Integration tests for the SQLite section store
//!
//! Covers on-disk persistence, the unique number constraint under a full
//! placeholder renumbering, and rollback of interrupted transactions.

#![cfg(feature = "sqlite")]

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tiles_storage::{
    CourseId, ErrorKind, NewSection, Section, SectionId, SectionRepository, SectionTransaction,
    SqliteOptions, SqliteSectionStore,
};

const COURSE: CourseId = CourseId(3);

fn numbers(sections: &[Section]) -> Vec<(i64, i64)> {
    sections.iter().map(|s| (s.id.0, s.number)).collect()
}

#[test]
fn test_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("course.db");

    let ids = {
        let mut store = SqliteSectionStore::new(&path).unwrap();
        let mut tx = store.begin(COURSE).unwrap();
        let general = tx.insert_section(&NewSection::new(0, 0)).unwrap();
        let week = tx.insert_section(&NewSection::new(1, 0)).unwrap();
        tx.write_name(week, Some("Week 1")).unwrap();
        tx.commit().unwrap();
        (general, week)
    };

    let store = SqliteSectionStore::with_options(
        &path,
        SqliteOptions {
            busy_timeout_ms: 250,
        },
    )
    .unwrap();
    let rows = store.sections(COURSE).unwrap();

    assert_eq!(numbers(&rows), vec![(ids.0 .0, 0), (ids.1 .0, 1)]);
    assert_eq!(rows[1].name.as_deref(), Some("Week 1"));
}

#[test]
fn test_rotation_through_placeholders() {
    let mut store = SqliteSectionStore::in_memory().unwrap();
    store
        .seed(
            COURSE,
            &[
                Section::new(SectionId(1), 0, 0),
                Section::new(SectionId(2), 1, 0),
                Section::new(SectionId(3), 2, 0),
                Section::new(SectionId(4), 3, 0),
            ],
        )
        .unwrap();

    // Rotate 1 -> 3, 2 -> 1, 3 -> 2: direct writes would collide
    let target = [(SectionId(2), 3), (SectionId(3), 1), (SectionId(4), 2)];
    let mut tx = store.begin(COURSE).unwrap();
    for (id, number) in target {
        tx.write_number(id, -number).unwrap();
    }
    for (id, number) in target {
        tx.write_number(id, number).unwrap();
    }
    tx.commit().unwrap();

    let rows = store.sections(COURSE).unwrap();
    assert_eq!(numbers(&rows), vec![(1, 0), (3, 1), (4, 2), (2, 3)]);
}

#[test]
fn test_failed_write_leaves_rows_untouched() {
    let mut store = SqliteSectionStore::in_memory().unwrap();
    store
        .seed(
            COURSE,
            &[
                Section::new(SectionId(1), 0, 0),
                Section::new(SectionId(2), 1, 0),
                Section::new(SectionId(3), 2, 0),
            ],
        )
        .unwrap();
    let before = store.sections(COURSE).unwrap();

    {
        let mut tx = store.begin(COURSE).unwrap();
        tx.write_number(SectionId(2), -2).unwrap();
        let err = tx.write_number(SectionId(3), 0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    assert_eq!(store.sections(COURSE).unwrap(), before);
}

#[test]
fn test_ids_not_reused_after_delete() {
    let mut store = SqliteSectionStore::in_memory().unwrap();

    let mut tx = store.begin(COURSE).unwrap();
    tx.insert_section(&NewSection::new(0, 0)).unwrap();
    let doomed = tx.insert_section(&NewSection::new(1, 0)).unwrap();
    tx.commit().unwrap();

    let mut tx = store.begin(COURSE).unwrap();
    tx.delete_section(doomed).unwrap();
    tx.commit().unwrap();

    let mut tx = store.begin(COURSE).unwrap();
    let fresh = tx.insert_section(&NewSection::new(1, 0)).unwrap();
    tx.commit().unwrap();

    assert!(fresh.0 > doomed.0);
}
