//! Integrity audit of stored section rows
//!
//! Unlike [`SectionTree::build`], which stops at the first structural problem,
//! [`verify`] keeps going and reports every broken invariant it can find.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;
use tiles_storage::{Section, SectionId, GENERAL_SECTION};

use crate::renumber::reorder;
use crate::tree::SectionTree;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityViolation {
    MissingRoot,
    RootHasParent { parent: i64 },
    DuplicateNumber { number: i64, sections: Vec<SectionId> },
    /// Numbers are not exactly `0..len`
    NumberGap { missing: i64 },
    DanglingParent { section: SectionId, parent: i64 },
    /// Parent chain never reaches the general section
    Cycle { section: SectionId },
    VisibleUnderHidden { section: SectionId },
    /// Pinned section that is not top-level
    NestedPin { section: SectionId },
    /// Valid tree whose numbers are not in pre-order
    NotPreOrder,
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRoot => write!(f, "no general section"),
            Self::RootHasParent { parent } => {
                write!(f, "general section has parent {}", parent)
            }
            Self::DuplicateNumber { number, sections } => {
                write!(f, "number {} shared by {} sections", number, sections.len())
            }
            Self::NumberGap { missing } => write!(f, "number {} is unused", missing),
            Self::DanglingParent { section, parent } => {
                write!(f, "{} points at missing parent {}", section, parent)
            }
            Self::Cycle { section } => write!(f, "{} is part of a parent cycle", section),
            Self::VisibleUnderHidden { section } => {
                write!(f, "{} is visible under a hidden parent", section)
            }
            Self::NestedPin { section } => write!(f, "{} is pinned below the top level", section),
            Self::NotPreOrder => write!(f, "numbers are not in pre-order"),
        }
    }
}

/// Every violation found in `sections`; empty means healthy
pub fn verify(sections: &[Section]) -> Vec<IntegrityViolation> {
    let mut violations = Vec::new();

    let mut by_number: BTreeMap<i64, Vec<&Section>> = BTreeMap::new();
    for section in sections {
        by_number.entry(section.number).or_default().push(section);
    }

    match by_number.get(&GENERAL_SECTION).and_then(|rows| rows.first()) {
        None => violations.push(IntegrityViolation::MissingRoot),
        Some(root) if root.parent != GENERAL_SECTION => {
            violations.push(IntegrityViolation::RootHasParent {
                parent: root.parent,
            })
        }
        Some(_) => {}
    }

    for (number, rows) in &by_number {
        if rows.len() > 1 {
            violations.push(IntegrityViolation::DuplicateNumber {
                number: *number,
                sections: rows.iter().map(|s| s.id).collect(),
            });
        }
    }

    for missing in 0..sections.len() as i64 {
        if !by_number.contains_key(&missing) {
            violations.push(IntegrityViolation::NumberGap { missing });
        }
    }

    for section in sections.iter().filter(|s| !s.is_general()) {
        let Some(parent) = parent_row(&by_number, section) else {
            violations.push(IntegrityViolation::DanglingParent {
                section: section.id,
                parent: section.parent,
            });
            continue;
        };

        if section.visible && !parent.visible {
            violations.push(IntegrityViolation::VisibleUnderHidden {
                section: section.id,
            });
        }

        if section.pinned && section.parent != GENERAL_SECTION {
            violations.push(IntegrityViolation::NestedPin {
                section: section.id,
            });
        }

        let mut seen = HashSet::from([section.id]);
        let mut current = parent;
        loop {
            if current.is_general() {
                break;
            }
            if !seen.insert(current.id) {
                violations.push(IntegrityViolation::Cycle {
                    section: section.id,
                });
                break;
            }
            match parent_row(&by_number, current) {
                Some(next) => current = next,
                // reported as dangling on its own row
                None => break,
            }
        }
    }

    if violations.is_empty() {
        let in_pre_order = SectionTree::build(sections.to_vec())
            .ok()
            .and_then(|tree| {
                let plan = reorder(&tree, None).ok()?;
                Some(plan.changed_numbers(&tree).is_empty())
            })
            .unwrap_or(false);
        if !in_pre_order {
            violations.push(IntegrityViolation::NotPreOrder);
        }
    }

    violations
}

fn parent_row<'a>(by_number: &BTreeMap<i64, Vec<&'a Section>>, section: &Section) -> Option<&'a Section> {
    by_number
        .get(&section.parent)
        .and_then(|rows| rows.first())
        .copied()
}
