//! Visibility propagation
//!
//! Each row stores `visible` plus `visibleold`, the value to restore once the
//! hiding ancestor is shown again. A hidden row with `visibleold = false` was
//! hidden on its own and keeps its subtree hidden when an ancestor reappears.
//!
//! All functions here plan changes against a loaded tree; nothing is written.

use thiserror::Error;
use tiles_storage::SectionId;

use crate::tree::SectionTree;

/// New flag pair for one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityChange {
    pub id: SectionId,
    pub visible: bool,
    pub visibleold: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VisibilityError {
    #[error("{0} does not exist")]
    UnknownSection(SectionId),

    #[error("the general section uses the course display marker")]
    GeneralSection,

    #[error("{section} cannot be shown while its parent is hidden")]
    ParentHidden { section: SectionId },
}

/// Hide `id` on its own and conceal every visible descendant
pub fn hide(tree: &SectionTree, id: SectionId) -> Result<Vec<VisibilityChange>, VisibilityError> {
    let section = checked(tree, id)?;

    let mut changes = Vec::new();
    if section.visible || section.visibleold {
        changes.push(VisibilityChange {
            id,
            visible: false,
            visibleold: false,
        });
    }
    for descendant in tree.subtree(id).into_iter().skip(1) {
        changes.extend(conceal(tree, descendant));
    }
    Ok(changes)
}

/// Show `id` and restore descendants hidden only through it
pub fn show(tree: &SectionTree, id: SectionId) -> Result<Vec<VisibilityChange>, VisibilityError> {
    let section = checked(tree, id)?;
    if let Some(parent) = tree.parent(id) {
        if !tree.is_effectively_visible(parent) {
            return Err(VisibilityError::ParentHidden { section: id });
        }
    }

    let mut changes = Vec::new();
    if !(section.visible && section.visibleold) {
        changes.push(VisibilityChange {
            id,
            visible: true,
            visibleold: true,
        });
    }
    reveal_descendants(tree, id, &mut changes);
    Ok(changes)
}

/// Align a just-moved subtree with the visibility of its new parent
///
/// `tree` is the state before the move; `new_parent` must not lie inside the
/// moved subtree.
pub fn reconcile_moved(
    tree: &SectionTree,
    moved: SectionId,
    new_parent: SectionId,
) -> Vec<VisibilityChange> {
    let Some(section) = tree.section(moved) else {
        return Vec::new();
    };

    if !tree.is_effectively_visible(new_parent) {
        return tree
            .subtree(moved)
            .into_iter()
            .filter_map(|id| conceal(tree, id))
            .collect();
    }

    let mut changes = Vec::new();
    if !section.visible && section.visibleold {
        changes.push(VisibilityChange {
            id: moved,
            visible: true,
            visibleold: true,
        });
        reveal_descendants(tree, moved, &mut changes);
    }
    changes
}

fn checked(
    tree: &SectionTree,
    id: SectionId,
) -> Result<&tiles_storage::Section, VisibilityError> {
    if id == tree.root() {
        return Err(VisibilityError::GeneralSection);
    }
    tree.section(id).ok_or(VisibilityError::UnknownSection(id))
}

/// Hidden by an ancestor: visible rows remember they were visible
fn conceal(tree: &SectionTree, id: SectionId) -> Option<VisibilityChange> {
    let section = tree.section(id)?;
    section.visible.then_some(VisibilityChange {
        id,
        visible: false,
        visibleold: true,
    })
}

fn reveal_descendants(tree: &SectionTree, id: SectionId, changes: &mut Vec<VisibilityChange>) {
    let mut stack: Vec<SectionId> = tree.children(id).iter().rev().copied().collect();
    while let Some(current) = stack.pop() {
        let Some(section) = tree.section(current) else {
            continue;
        };
        if !section.visible {
            if !section.visibleold {
                continue;
            }
            changes.push(VisibilityChange {
                id: current,
                visible: true,
                visibleold: true,
            });
        }
        stack.extend(tree.children(current).iter().rev().copied());
    }
}
