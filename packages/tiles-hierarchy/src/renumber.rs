//! Renumbering Engine
//!
//! Computes the full `SectionId → number` permutation for a tree, optionally
//! with one subtree grafted to a new position. Numbers are handed out in
//! pre-order from the general section, so every subtree occupies a contiguous
//! range directly after its root.
//!
//! The engine only plans. Writing the plan back is the coordinator's job.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tiles_storage::{SectionId, GENERAL_SECTION};

use crate::tree::SectionTree;

/// Subtree relocation applied during the traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Graft {
    pub moved: SectionId,
    /// Resolved parent (the general section for top level)
    pub parent: SectionId,
    pub before: Option<SectionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenumberError {
    #[error("graft references unknown {0}")]
    UnknownNode(SectionId),

    #[error("the general section cannot be grafted")]
    GraftRoot,

    #[error("{before} is not a child of {parent}")]
    BeforeNotChild { before: SectionId, parent: SectionId },

    #[error("traversal reached {visited} of {expected} sections")]
    Incomplete { visited: usize, expected: usize },
}

/// New number and parent for every section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renumbering {
    order: Vec<SectionId>,
    numbers: HashMap<SectionId, i64>,
    parents: HashMap<SectionId, SectionId>,
}

impl Renumbering {
    pub fn number_of(&self, id: SectionId) -> Option<i64> {
        self.numbers.get(&id).copied()
    }

    /// Logical parent after the change; `None` for the general section
    pub fn parent_of(&self, id: SectionId) -> Option<SectionId> {
        self.parents.get(&id).copied()
    }

    /// Sections in new number order
    pub fn ordered(&self) -> &[SectionId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Sections whose number differs from the one stored in `tree`
    pub fn changed_numbers(&self, tree: &SectionTree) -> Vec<(SectionId, i64)> {
        self.order
            .iter()
            .filter_map(|id| {
                let new = self.number_of(*id)?;
                let old = tree.section(*id)?.number;
                (new != old).then_some((*id, new))
            })
            .collect()
    }

    /// Sections whose stored parent number must be rewritten
    pub fn parent_rewrites(&self, tree: &SectionTree) -> Vec<(SectionId, i64)> {
        self.order
            .iter()
            .filter_map(|id| {
                let stored = tree.section(*id)?.parent;
                let parent_number = match self.parent_of(*id) {
                    Some(parent) => self.number_of(parent)?,
                    None => GENERAL_SECTION,
                };
                (parent_number != stored).then_some((*id, parent_number))
            })
            .collect()
    }
}

/// Pre-order renumbering of `tree`, with `graft` applied when given
pub fn reorder(tree: &SectionTree, graft: Option<Graft>) -> Result<Renumbering, RenumberError> {
    if let Some(g) = graft {
        for id in [g.moved, g.parent] {
            if !tree.contains(id) {
                return Err(RenumberError::UnknownNode(id));
            }
        }
        if g.moved == tree.root() {
            return Err(RenumberError::GraftRoot);
        }
        if let Some(before) = g.before {
            if before == g.moved || tree.parent(before) != Some(g.parent) {
                return Err(RenumberError::BeforeNotChild {
                    before,
                    parent: g.parent,
                });
            }
        }
    }

    let expected = tree.len();
    let mut order = Vec::with_capacity(expected);
    let mut numbers = HashMap::with_capacity(expected);
    let mut parents = HashMap::with_capacity(expected);
    let mut visited = HashSet::with_capacity(expected);

    let mut stack: Vec<(SectionId, Option<SectionId>)> = vec![(tree.root(), None)];
    while let Some((id, parent)) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        numbers.insert(id, order.len() as i64);
        if let Some(parent) = parent {
            parents.insert(id, parent);
        }
        order.push(id);

        let children = grafted_children(tree, id, graft.as_ref());
        stack.extend(children.into_iter().rev().map(|child| (child, Some(id))));
    }

    if order.len() != expected {
        return Err(RenumberError::Incomplete {
            visited: order.len(),
            expected,
        });
    }

    Ok(Renumbering {
        order,
        numbers,
        parents,
    })
}

/// Children of `id` as they will be after the graft
fn grafted_children(tree: &SectionTree, id: SectionId, graft: Option<&Graft>) -> Vec<SectionId> {
    let current = tree.children(id);
    let Some(g) = graft else {
        return current.to_vec();
    };

    let mut children: Vec<SectionId> = current.iter().copied().filter(|c| *c != g.moved).collect();
    if id == g.parent {
        let at = g
            .before
            .and_then(|before| children.iter().position(|c| *c == before))
            .unwrap_or(children.len());
        children.insert(at, g.moved);
    }
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tiles_storage::Section;

    const ROOT: SectionId = SectionId(1);
    const S1: SectionId = SectionId(2);
    const S2: SectionId = SectionId(3);
    const S3: SectionId = SectionId(4);
    const S4: SectionId = SectionId(5);

    /// 0 { 1 { 2, 3 }, 4 }
    fn tree() -> SectionTree {
        SectionTree::build(vec![
            Section::new(ROOT, 0, 0),
            Section::new(S1, 1, 0),
            Section::new(S2, 2, 1),
            Section::new(S3, 3, 1),
            Section::new(S4, 4, 0),
        ])
        .unwrap()
    }

    fn graft(moved: SectionId, parent: SectionId, before: Option<SectionId>) -> Option<Graft> {
        Some(Graft {
            moved,
            parent,
            before,
        })
    }

    #[test]
    fn test_identity_without_graft() {
        let t = tree();
        let plan = reorder(&t, None).unwrap();

        assert_eq!(plan.ordered(), &[ROOT, S1, S2, S3, S4]);
        assert!(plan.changed_numbers(&t).is_empty());
        assert!(plan.parent_rewrites(&t).is_empty());
    }

    #[test]
    fn test_move_leaf_under_sibling_branch() {
        let t = tree();
        let plan = reorder(&t, graft(S3, S4, None)).unwrap();

        assert_eq!(plan.ordered(), &[ROOT, S1, S2, S4, S3]);
        assert_eq!(plan.number_of(S3), Some(4));
        assert_eq!(plan.number_of(S4), Some(3));
        assert_eq!(plan.parent_of(S3), Some(S4));
        assert_eq!(plan.parent_of(ROOT), None);
        assert_eq!(plan.changed_numbers(&t), vec![(S4, 3), (S3, 4)]);
        // S3 now hangs off S4 (number 3); nothing else changes parent
        assert_eq!(plan.parent_rewrites(&t), vec![(S3, 3)]);
    }

    #[test]
    fn test_move_subtree_before_sibling() {
        let t = tree();
        let plan = reorder(&t, graft(S4, ROOT, Some(S1))).unwrap();

        assert_eq!(plan.ordered(), &[ROOT, S4, S1, S2, S3]);
        // S2 and S3 keep S1 as parent but S1 is now number 2
        assert_eq!(plan.parent_rewrites(&t), vec![(S2, 2), (S3, 2)]);
    }

    #[test]
    fn test_subtree_moves_as_a_block() {
        let t = tree();
        let plan = reorder(&t, graft(S1, S4, None)).unwrap();

        assert_eq!(plan.ordered(), &[ROOT, S4, S1, S2, S3]);
        assert_eq!(plan.parent_of(S1), Some(S4));
        assert_eq!(plan.parent_of(S2), Some(S1));
    }

    #[test]
    fn test_graft_to_end_of_top_level() {
        let t = tree();
        let plan = reorder(&t, graft(S1, ROOT, None)).unwrap();

        assert_eq!(plan.ordered(), &[ROOT, S4, S1, S2, S3]);
        assert_eq!(plan.number_of(S3), Some(4));
    }

    #[test]
    fn test_normalizes_non_preorder_numbers() {
        // 0 { 1 { 3 }, 2 }: valid tree, numbers not in pre-order
        let t = SectionTree::build(vec![
            Section::new(ROOT, 0, 0),
            Section::new(S1, 1, 0),
            Section::new(S4, 2, 0),
            Section::new(S2, 3, 1),
        ])
        .unwrap();
        let plan = reorder(&t, None).unwrap();

        assert_eq!(plan.ordered(), &[ROOT, S1, S2, S4]);
        assert_eq!(plan.changed_numbers(&t), vec![(S2, 2), (S4, 3)]);
        assert!(plan.parent_rewrites(&t).is_empty());
    }

    #[test]
    fn test_permutation_is_dense() {
        let t = tree();
        let plan = reorder(&t, graft(S2, S4, None)).unwrap();

        let mut numbers: Vec<i64> = plan.ordered().iter().filter_map(|id| plan.number_of(*id)).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec![0, 1, 2, 3, 4]);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Rejected grafts
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_graft_into_own_subtree_is_incomplete() {
        let t = tree();
        assert_eq!(
            reorder(&t, graft(S1, S3, None)).unwrap_err(),
            RenumberError::Incomplete {
                visited: 2,
                expected: 5
            }
        );
    }

    #[test]
    fn test_graft_validation() {
        let t = tree();
        assert_eq!(
            reorder(&t, graft(SectionId(42), ROOT, None)).unwrap_err(),
            RenumberError::UnknownNode(SectionId(42))
        );
        assert_eq!(
            reorder(&t, graft(ROOT, S4, None)).unwrap_err(),
            RenumberError::GraftRoot
        );
        assert_eq!(
            reorder(&t, graft(S4, S1, Some(S1))).unwrap_err(),
            RenumberError::BeforeNotChild {
                before: S1,
                parent: S1
            }
        );
    }
}
