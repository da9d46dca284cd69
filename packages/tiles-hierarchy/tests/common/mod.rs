//! Shared fixtures for the hierarchy integration tests

#![allow(dead_code)]

use std::sync::Once;

use tiles_hierarchy::{HierarchyConfig, SectionCoordinator};
use tiles_storage::{CourseId, InMemorySectionStore, Section, SectionId};
use tracing_subscriber::EnvFilter;

pub const COURSE: CourseId = CourseId(42);

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("tiles_hierarchy=debug,tiles_storage=debug"))
            .with_test_writer()
            .try_init();
    });
}

/// Seeded id of the section initially numbered `number`
pub fn sid(number: i64) -> SectionId {
    SectionId(100 + number)
}

/// Store holding one course laid out as `(number, parent)` pairs
pub fn store_with(layout: &[(i64, i64)]) -> InMemorySectionStore {
    let mut store = InMemorySectionStore::new();
    store.seed(
        COURSE,
        layout
            .iter()
            .map(|(number, parent)| Section::new(sid(*number), *number, *parent))
            .collect(),
    );
    store
}

pub fn coordinator_with(layout: &[(i64, i64)]) -> SectionCoordinator<InMemorySectionStore> {
    init_tracing();
    SectionCoordinator::new(store_with(layout), HierarchyConfig::default())
        .expect("default config is valid")
}

/// `(id, number, parent)` of every committed row, by number
pub fn layout_of(store: &InMemorySectionStore) -> Vec<(SectionId, i64, i64)> {
    store
        .sections(COURSE)
        .iter()
        .map(|s| (s.id, s.number, s.parent))
        .collect()
}

/// Committed row for `id`
pub fn row(store: &InMemorySectionStore, id: SectionId) -> Section {
    store
        .sections(COURSE)
        .into_iter()
        .find(|s| s.id == id)
        .expect("row exists")
}

/// Numbers are `0..len` and every parent chain reaches the general section
pub fn assert_well_formed(sections: &[Section]) {
    let mut numbers: Vec<i64> = sections.iter().map(|s| s.number).collect();
    numbers.sort_unstable();
    let expected: Vec<i64> = (0..sections.len() as i64).collect();
    assert_eq!(numbers, expected, "numbers must be a dense permutation");

    for section in sections {
        let mut current = section.clone();
        let mut steps = 0;
        while current.number != 0 {
            current = sections
                .iter()
                .find(|s| s.number == current.parent)
                .cloned()
                .unwrap_or_else(|| panic!("{} has a dangling parent", current.id));
            steps += 1;
            assert!(steps <= sections.len(), "{} is in a parent cycle", section.id);
        }
    }
    assert!(
        tiles_hierarchy::verify(sections).is_empty(),
        "audit found violations: {:?}",
        tiles_hierarchy::verify(sections)
    );
}
