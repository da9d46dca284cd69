//! Move validation
//!
//! Pure check of a proposed move against a loaded [`SectionTree`]. A declined
//! move is an ordinary outcome, reported as [`MoveVerdict::Rejected`].

use thiserror::Error;
use tiles_storage::SectionId;

use crate::tree::SectionTree;

/// Proposed move of `section` (with its subtree)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub section: SectionId,
    /// `None` = top level
    pub new_parent: Option<SectionId>,
    /// Sibling to insert in front of; `None` = append
    pub before: Option<SectionId>,
}

impl MoveRequest {
    pub fn new(section: SectionId, new_parent: Option<SectionId>, before: Option<SectionId>) -> Self {
        Self {
            section,
            new_parent,
            before,
        }
    }
}

/// Why a move was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejection {
    #[error("{0} does not exist")]
    UnknownSection(SectionId),

    #[error("target parent {0} does not exist")]
    UnknownParent(SectionId),

    #[error("caller may not edit this course")]
    Unauthorized,

    #[error("the general section cannot be moved")]
    GeneralSection,

    #[error("{section} cannot be placed inside its own subtree")]
    IntoOwnSubtree { section: SectionId },

    #[error("{before} is not a child of the target parent")]
    BeforeNotChild { before: SectionId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveVerdict {
    Allowed,
    /// Valid, but the section already sits where requested
    NoOp,
    Rejected(MoveRejection),
}

impl MoveVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Run every check in order and report the first failure
pub fn check_move(tree: &SectionTree, req: &MoveRequest, authorized: bool) -> MoveVerdict {
    match evaluate(tree, req, authorized) {
        Ok(verdict) => verdict,
        Err(rejection) => MoveVerdict::Rejected(rejection),
    }
}

/// True only when the move would change the tree
pub fn can_move(tree: &SectionTree, req: &MoveRequest, authorized: bool) -> bool {
    check_move(tree, req, authorized).is_allowed()
}

fn evaluate(
    tree: &SectionTree,
    req: &MoveRequest,
    authorized: bool,
) -> Result<MoveVerdict, MoveRejection> {
    let section = req.section;
    if !tree.contains(section) {
        return Err(MoveRejection::UnknownSection(section));
    }
    let new_parent = req.new_parent.unwrap_or_else(|| tree.root());
    if !tree.contains(new_parent) {
        return Err(MoveRejection::UnknownParent(new_parent));
    }
    if !authorized {
        return Err(MoveRejection::Unauthorized);
    }

    if section == tree.root() {
        return Err(MoveRejection::GeneralSection);
    }

    if tree.is_in_subtree(new_parent, section) {
        return Err(MoveRejection::IntoOwnSubtree { section });
    }

    if let Some(before) = req.before {
        if tree.parent(before) != Some(new_parent) {
            return Err(MoveRejection::BeforeNotChild { before });
        }
    }

    if tree.parent(section) == Some(new_parent) {
        let next = tree.next_sibling(section);
        let unchanged = match req.before {
            Some(before) => before == section || Some(before) == next,
            None => next.is_none(),
        };
        if unchanged {
            return Ok(MoveVerdict::NoOp);
        }
    }

    Ok(MoveVerdict::Allowed)
}
