//! Tree View
//!
//! In-memory forest rebuilt from the flat section rows at the start of every
//! operation. Nodes live in an arena keyed by the stable [`SectionId`]; the
//! `number → id` lookup is rebuilt from the rows and never outlives the tree.
//!
//! Children are ordered by their current number. Every walk is iterative and
//! guarded by a visited set, so corrupted parent chains cannot loop forever.

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;
use tiles_storage::{Section, SectionId, GENERAL_SECTION};

/// Structural problems found while rebuilding the tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("course has no general section (number 0)")]
    MissingRoot,

    #[error("number {number} is used by both {first} and {second}")]
    DuplicateNumber {
        number: i64,
        first: SectionId,
        second: SectionId,
    },

    #[error("{0} appears more than once")]
    DuplicateId(SectionId),

    #[error("{section} references missing parent number {parent}")]
    DanglingParent { section: SectionId, parent: i64 },

    #[error("general section must have parent 0, found {0}")]
    RootReparented(i64),

    #[error("{0} is not reachable from the general section")]
    Unreachable(SectionId),
}

/// One node of the arena
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub section: Section,
    /// `None` only for the general section
    pub parent: Option<SectionId>,
    pub children: Vec<SectionId>,
}

/// Course section tree
#[derive(Debug, Clone)]
pub struct SectionTree {
    nodes: HashMap<SectionId, TreeNode>,
    by_number: BTreeMap<i64, SectionId>,
    root: SectionId,
}

impl SectionTree {
    /// Rebuild the tree from flat rows
    pub fn build(sections: Vec<Section>) -> Result<Self, TreeError> {
        let mut by_number = BTreeMap::new();
        let mut seen_ids = HashSet::new();
        for section in &sections {
            if !seen_ids.insert(section.id) {
                return Err(TreeError::DuplicateId(section.id));
            }
            if let Some(first) = by_number.insert(section.number, section.id) {
                return Err(TreeError::DuplicateNumber {
                    number: section.number,
                    first,
                    second: section.id,
                });
            }
        }

        let root = *by_number
            .get(&GENERAL_SECTION)
            .ok_or(TreeError::MissingRoot)?;

        let mut nodes = HashMap::with_capacity(sections.len());
        for section in sections {
            let parent = if section.id == root {
                if section.parent != GENERAL_SECTION {
                    return Err(TreeError::RootReparented(section.parent));
                }
                None
            } else {
                let parent_id = by_number.get(&section.parent).copied().ok_or(
                    TreeError::DanglingParent {
                        section: section.id,
                        parent: section.parent,
                    },
                )?;
                Some(parent_id)
            };
            nodes.insert(
                section.id,
                TreeNode {
                    section,
                    parent,
                    children: Vec::new(),
                },
            );
        }

        // by_number iterates in numeric order, so children come out sorted
        for id in by_number.values() {
            if let Some(parent) = nodes.get(id).and_then(|n| n.parent) {
                if let Some(parent_node) = nodes.get_mut(&parent) {
                    parent_node.children.push(*id);
                }
            }
        }

        let tree = Self {
            nodes,
            by_number,
            root,
        };

        let reachable: HashSet<SectionId> = tree.subtree(root).into_iter().collect();
        if reachable.len() != tree.nodes.len() {
            let stray = tree
                .by_number
                .values()
                .find(|id| !reachable.contains(id))
                .copied()
                .unwrap_or(root);
            return Err(TreeError::Unreachable(stray));
        }

        Ok(tree)
    }

    /// The general section
    pub fn root(&self) -> SectionId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: SectionId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: SectionId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.nodes.get(&id).map(|n| &n.section)
    }

    /// Section currently holding `number`
    pub fn id_at(&self, number: i64) -> Option<SectionId> {
        self.by_number.get(&number).copied()
    }

    pub fn parent(&self, id: SectionId) -> Option<SectionId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Direct children in display order
    pub fn children(&self, id: SectionId) -> &[SectionId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn next_sibling(&self, id: SectionId) -> Option<SectionId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|s| *s == id)?;
        siblings.get(pos + 1).copied()
    }

    pub fn is_top_level(&self, id: SectionId) -> bool {
        self.parent(id) == Some(self.root)
    }

    /// Ancestors from the parent up to the general section
    pub fn ancestors(&self, id: SectionId) -> Vec<SectionId> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if !visited.insert(ancestor) {
                break;
            }
            chain.push(ancestor);
            current = self.parent(ancestor);
        }
        chain
    }

    /// True when `id` is `subtree_root` or one of its descendants
    pub fn is_in_subtree(&self, id: SectionId, subtree_root: SectionId) -> bool {
        id == subtree_root || self.ancestors(id).contains(&subtree_root)
    }

    /// `id` and all its descendants, pre-order
    pub fn subtree(&self, id: SectionId) -> Vec<SectionId> {
        let mut order = Vec::new();
        if !self.contains(id) {
            return order;
        }
        let mut visited = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        order
    }

    /// Whole tree, pre-order from the general section
    pub fn pre_order(&self) -> Vec<SectionId> {
        self.subtree(self.root)
    }

    /// Stored visibility of `id` and of every ancestor
    pub fn is_effectively_visible(&self, id: SectionId) -> bool {
        let Some(section) = self.section(id) else {
            return false;
        };
        section.visible
            && self
                .ancestors(id)
                .iter()
                .filter_map(|a| self.section(*a))
                .all(|s| s.visible)
    }

    /// Rows ordered by current number
    pub fn sections(&self) -> impl Iterator<Item = &Section> + '_ {
        self.by_number
            .values()
            .filter_map(|id| self.nodes.get(id))
            .map(|n| &n.section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0 { 1 { 2, 3 }, 4 }
    fn sample() -> Vec<Section> {
        vec![
            Section::new(SectionId(100), 0, 0),
            Section::new(SectionId(101), 1, 0),
            Section::new(SectionId(102), 2, 1),
            Section::new(SectionId(103), 3, 1),
            Section::new(SectionId(104), 4, 0),
        ]
    }

    #[test]
    fn test_build_links_children_in_number_order() {
        let tree = SectionTree::build(sample()).unwrap();

        assert_eq!(tree.len(), 5);
        assert_eq!(tree.root(), SectionId(100));
        assert_eq!(tree.children(SectionId(100)), &[SectionId(101), SectionId(104)]);
        assert_eq!(tree.children(SectionId(101)), &[SectionId(102), SectionId(103)]);
        assert_eq!(tree.parent(SectionId(103)), Some(SectionId(101)));
        assert_eq!(tree.id_at(4), Some(SectionId(104)));
    }

    #[test]
    fn test_children_follow_numbers_not_row_order() {
        let mut rows = sample();
        rows.reverse();
        let tree = SectionTree::build(rows).unwrap();

        assert_eq!(tree.children(SectionId(101)), &[SectionId(102), SectionId(103)]);
    }

    #[test]
    fn test_navigation() {
        let tree = SectionTree::build(sample()).unwrap();

        assert_eq!(tree.next_sibling(SectionId(102)), Some(SectionId(103)));
        assert_eq!(tree.next_sibling(SectionId(103)), None);
        assert_eq!(tree.next_sibling(SectionId(100)), None);
        assert!(tree.is_top_level(SectionId(104)));
        assert!(!tree.is_top_level(SectionId(102)));
        assert_eq!(
            tree.ancestors(SectionId(103)),
            vec![SectionId(101), SectionId(100)]
        );
        assert!(tree.is_in_subtree(SectionId(103), SectionId(101)));
        assert!(tree.is_in_subtree(SectionId(101), SectionId(101)));
        assert!(!tree.is_in_subtree(SectionId(104), SectionId(101)));
    }

    #[test]
    fn test_pre_order() {
        let tree = SectionTree::build(sample()).unwrap();
        let order: Vec<i64> = tree.pre_order().iter().map(|id| id.0).collect();

        assert_eq!(order, vec![100, 101, 102, 103, 104]);
        assert_eq!(
            tree.subtree(SectionId(101)),
            vec![SectionId(101), SectionId(102), SectionId(103)]
        );
        assert!(tree.subtree(SectionId(999)).is_empty());
    }

    #[test]
    fn test_effective_visibility() {
        let mut rows = sample();
        rows[1] = rows[1].clone().hidden();
        let tree = SectionTree::build(rows).unwrap();

        assert!(!tree.is_effectively_visible(SectionId(101)));
        assert!(!tree.is_effectively_visible(SectionId(102)));
        assert!(tree.is_effectively_visible(SectionId(104)));
        assert!(!tree.is_effectively_visible(SectionId(999)));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Corrupted layouts
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_missing_root() {
        let rows = vec![Section::new(SectionId(1), 1, 0)];
        assert_eq!(SectionTree::build(rows).unwrap_err(), TreeError::MissingRoot);
    }

    #[test]
    fn test_duplicate_number() {
        let mut rows = sample();
        rows[4].number = 3;
        assert!(matches!(
            SectionTree::build(rows),
            Err(TreeError::DuplicateNumber { number: 3, .. })
        ));
    }

    #[test]
    fn test_duplicate_id() {
        let mut rows = sample();
        rows[4].id = SectionId(101);
        assert_eq!(
            SectionTree::build(rows).unwrap_err(),
            TreeError::DuplicateId(SectionId(101))
        );
    }

    #[test]
    fn test_dangling_parent() {
        let mut rows = sample();
        rows[3].parent = 9;
        assert_eq!(
            SectionTree::build(rows).unwrap_err(),
            TreeError::DanglingParent {
                section: SectionId(103),
                parent: 9
            }
        );
    }

    #[test]
    fn test_root_with_parent() {
        let mut rows = sample();
        rows[0].parent = 4;
        assert_eq!(
            SectionTree::build(rows).unwrap_err(),
            TreeError::RootReparented(4)
        );
    }

    #[test]
    fn test_cycle_is_unreachable() {
        // 2 <-> 3 point at each other, detached from the root
        let mut rows = sample();
        rows[2].parent = 3;
        rows[3].parent = 2;
        assert_eq!(
            SectionTree::build(rows).unwrap_err(),
            TreeError::Unreachable(SectionId(102))
        );
    }

    #[test]
    fn test_self_parent_is_unreachable() {
        let mut rows = sample();
        rows[4].parent = 4;
        assert_eq!(
            SectionTree::build(rows).unwrap_err(),
            TreeError::Unreachable(SectionId(104))
        );
    }
}
