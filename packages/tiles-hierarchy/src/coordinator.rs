//! Mutation Coordinator
//!
//! Runs every structural operation inside one repository transaction:
//!
//! ```text
//! authorize → begin → load tree → validate → plan → write → commit → invalidate
//! ```
//!
//! Any error before `commit` drops the transaction, which rolls it back. The
//! cache invalidator only fires after a successful commit.

use tracing::{debug, info, warn};

use tiles_storage::{
    AllowAll, Authorizer, CacheInvalidator, CourseId, GeneralSectionDisplay, NewSection, NoCache,
    Section, SectionId, SectionRepository, SectionTransaction, GENERAL_SECTION,
};

use crate::config::{HierarchyConfig, RenumberMode};
use crate::error::{Capacity, HierarchyError, Result};
use crate::integrity::{self, IntegrityViolation};
use crate::renumber::{reorder, Graft, Renumbering};
use crate::tree::SectionTree;
use crate::validator::{check_move, MoveRejection, MoveRequest, MoveVerdict};
use crate::visibility::{self, VisibilityChange};

/// Result of [`SectionCoordinator::delete_section`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Removed sections, highest number first
    pub deleted: Vec<SectionId>,
    /// Rows renumbered to close the gap
    pub renumbered: usize,
}

/// Entry point for all section hierarchy operations
pub struct SectionCoordinator<R, A = AllowAll, C = NoCache> {
    repo: R,
    authorizer: A,
    cache: C,
    config: HierarchyConfig,
}

impl<R: SectionRepository> SectionCoordinator<R> {
    /// Coordinator that allows every edit and has no cache to invalidate
    pub fn new(repo: R, config: HierarchyConfig) -> Result<Self> {
        Self::with_parts(repo, AllowAll, NoCache, config)
    }
}

impl<R, A, C> SectionCoordinator<R, A, C>
where
    R: SectionRepository,
    A: Authorizer,
    C: CacheInvalidator,
{
    pub fn with_parts(repo: R, authorizer: A, cache: C, config: HierarchyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            repo,
            authorizer,
            cache,
            config,
        })
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    pub fn into_repository(self) -> R {
        self.repo
    }

    fn authorize(&self, course: CourseId) -> Result<()> {
        if self.authorizer.can_edit(course) {
            Ok(())
        } else {
            warn!("Edit of {} refused: not authorized", course);
            Err(HierarchyError::Unauthorized(course))
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Structural mutations
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Create the general section if the course has none yet
    pub fn init_course(&mut self, course: CourseId) -> Result<SectionId> {
        self.authorize(course)?;

        let mut tx = self.repo.begin(course)?;
        let rows = tx.load_all()?;
        if let Some(root) = rows.iter().find(|s| s.is_general()) {
            return Ok(root.id);
        }
        if !rows.is_empty() {
            warn!("{} has {} sections but no general section", course, rows.len());
            return Err(HierarchyError::integrity(format!(
                "{} has sections but no general section",
                course
            )));
        }

        let id = tx.insert_section(&NewSection::new(GENERAL_SECTION, GENERAL_SECTION))?;
        tx.commit()?;

        info!("Initialized {} with general section {}", course, id);
        self.cache.invalidate(course);
        Ok(id)
    }

    /// Append a new section as the last child of `parent` (top level if `None`)
    ///
    /// The row is inserted at the next free number, then the course is
    /// renumbered into pre-order. The returned number is the new section's
    /// pre-order position, which differs from the next free number when
    /// `parent` is not the last branch; later sections shift down by one.
    pub fn create_section(&mut self, course: CourseId, parent: Option<SectionId>) -> Result<i64> {
        self.authorize(course)?;
        let max_sections = self.config.max_sections;
        let mode = self.config.renumber;

        let mut tx = self.repo.begin(course)?;
        let tree = load_tree(&mut tx)?;
        let parent_id = parent.unwrap_or_else(|| tree.root());
        let parent_section = tree
            .section(parent_id)
            .ok_or(HierarchyError::NotFound(parent_id))?;

        if let Some(limit) = max_sections {
            if tree.len().saturating_sub(1) >= limit {
                warn!("{} already holds {} sections", course, limit);
                return Err(HierarchyError::CapacityExceeded {
                    what: Capacity::Sections,
                    limit,
                });
            }
        }

        let next_free = tree.sections().last().map_or(1, |s| s.number + 1);
        let mut row = NewSection::new(next_free, parent_section.number);
        if !tree.is_effectively_visible(parent_id) {
            // hidden through its parent: reappears when the parent is shown
            row.visible = false;
        }
        let id = tx.insert_section(&row)?;

        let tree = load_tree(&mut tx)?;
        let plan = reorder(&tree, None)?;
        apply_renumbering(&mut tx, &tree, &plan, mode)?;
        let number = plan
            .number_of(id)
            .ok_or_else(|| HierarchyError::integrity(format!("{} missing after insert", id)))?;
        tx.commit()?;

        info!("Created {} in {} at number {}", id, course, number);
        self.cache.invalidate(course);
        Ok(number)
    }

    /// Move `section` with its subtree under `new_parent`, in front of `before`
    ///
    /// Returns the section's resulting number; a no-op move returns the
    /// current one without writing. A pinned section moved below the top
    /// level loses its pin.
    pub fn move_section(
        &mut self,
        course: CourseId,
        section: SectionId,
        new_parent: Option<SectionId>,
        before: Option<SectionId>,
    ) -> Result<i64> {
        if !self.authorizer.can_edit(course) {
            warn!("Move of {} in {} refused: not authorized", section, course);
            return Err(MoveRejection::Unauthorized.into());
        }
        let mode = self.config.renumber;

        let mut tx = self.repo.begin(course)?;
        let tree = load_tree(&mut tx)?;
        let request = MoveRequest::new(section, new_parent, before);

        match check_move(&tree, &request, true) {
            MoveVerdict::Rejected(rejection) => {
                warn!("Move of {} in {} rejected: {}", section, course, rejection);
                return Err(rejection.into());
            }
            MoveVerdict::NoOp => {
                debug!("Move of {} in {} is a no-op", section, course);
                return tree
                    .section(section)
                    .map(|s| s.number)
                    .ok_or(HierarchyError::NotFound(section));
            }
            MoveVerdict::Allowed => {}
        }

        let parent_id = new_parent.unwrap_or_else(|| tree.root());
        let plan = reorder(
            &tree,
            Some(Graft {
                moved: section,
                parent: parent_id,
                before,
            }),
        )?;
        apply_renumbering(&mut tx, &tree, &plan, mode)?;

        let changes = visibility::reconcile_moved(&tree, section, parent_id);
        if !changes.is_empty() {
            debug!("Move of {} changes visibility of {} sections", section, changes.len());
        }
        apply_visibility(&mut tx, &changes)?;

        let unpinned = parent_id != tree.root() && tree.section(section).is_some_and(|s| s.pinned);
        if unpinned {
            tx.write_pinned(section, false)?;
        }

        let number = plan
            .number_of(section)
            .ok_or(HierarchyError::NotFound(section))?;
        tx.commit()?;

        info!(
            "Moved {} in {} under {} at number {}{}",
            section,
            course,
            parent_id,
            number,
            if unpinned { " (pin cleared)" } else { "" }
        );
        self.cache.invalidate(course);
        Ok(number)
    }

    /// Delete `section` and every descendant, closing the numbering gap
    pub fn delete_section(&mut self, course: CourseId, section: SectionId) -> Result<DeleteOutcome> {
        self.authorize(course)?;
        let mode = self.config.renumber;

        let mut tx = self.repo.begin(course)?;
        let tree = load_tree(&mut tx)?;
        if !tree.contains(section) {
            return Err(HierarchyError::NotFound(section));
        }
        if section == tree.root() {
            warn!("Refused to delete the general section of {}", course);
            return Err(HierarchyError::invalid_operation(
                "the general section cannot be deleted",
            ));
        }

        let doomed = tree.subtree(section);
        let plan = reorder(
            &tree,
            Some(Graft {
                moved: section,
                parent: tree.root(),
                before: None,
            }),
        )?;
        let renumbered = apply_renumbering(&mut tx, &tree, &plan, mode)?;

        let deleted: Vec<SectionId> = plan
            .ordered()
            .iter()
            .rev()
            .take(doomed.len())
            .copied()
            .collect();
        if deleted.len() != doomed.len() || deleted.iter().any(|id| !doomed.contains(id)) {
            return Err(HierarchyError::integrity(format!(
                "tail of {} does not match the subtree of {}",
                course, section
            )));
        }
        for id in &deleted {
            tx.delete_section(*id)?;
        }
        tx.commit()?;

        info!(
            "Deleted {} with {} descendants from {}",
            section,
            deleted.len() - 1,
            course
        );
        self.cache.invalidate(course);
        Ok(DeleteOutcome {
            deleted,
            renumbered,
        })
    }

    /// Hide or show `section`
    ///
    /// For the general section only the course display marker changes.
    pub fn set_visible(&mut self, course: CourseId, section: SectionId, visible: bool) -> Result<()> {
        self.authorize(course)?;

        let mut tx = self.repo.begin(course)?;
        let tree = load_tree(&mut tx)?;
        if !tree.contains(section) {
            return Err(HierarchyError::NotFound(section));
        }

        if section == tree.root() {
            let marker = if visible {
                GeneralSectionDisplay::Shown
            } else {
                GeneralSectionDisplay::Hidden
            };
            tx.write_general_display(marker)?;
            tx.commit()?;
            info!("General section of {} marked {}", course, marker);
            self.cache.invalidate(course);
            return Ok(());
        }

        let planned = if visible {
            visibility::show(&tree, section)
        } else {
            visibility::hide(&tree, section)
        };
        let changes = planned.inspect_err(|e| {
            warn!("Visibility change of {} in {} refused: {}", section, course, e);
        })?;
        if changes.is_empty() {
            return Ok(());
        }

        apply_visibility(&mut tx, &changes)?;
        tx.commit()?;

        info!(
            "{} {} in {} ({} rows)",
            if visible { "Showed" } else { "Hid" },
            section,
            course,
            changes.len()
        );
        self.cache.invalidate(course);
        Ok(())
    }

    pub fn pin(&mut self, course: CourseId, section: SectionId) -> Result<()> {
        self.set_pinned(course, section, true)
    }

    pub fn unpin(&mut self, course: CourseId, section: SectionId) -> Result<()> {
        self.set_pinned(course, section, false)
    }

    fn set_pinned(&mut self, course: CourseId, section: SectionId, pinned: bool) -> Result<()> {
        self.authorize(course)?;
        let limit = self.config.max_pinned;

        let mut tx = self.repo.begin(course)?;
        let tree = load_tree(&mut tx)?;
        let row = tree.section(section).ok_or(HierarchyError::NotFound(section))?;
        if row.pinned == pinned {
            return Ok(());
        }

        if pinned {
            if !tree.is_top_level(section) {
                warn!("Refused to pin nested {} in {}", section, course);
                return Err(HierarchyError::invalid_operation(
                    "only top-level sections can be pinned",
                ));
            }
            let in_use = tree.sections().filter(|s| s.pinned).count();
            if in_use >= limit {
                warn!("{} already has {} pinned sections", course, in_use);
                return Err(HierarchyError::CapacityExceeded {
                    what: Capacity::PinnedSections,
                    limit,
                });
            }
        }

        tx.write_pinned(section, pinned)?;
        tx.commit()?;

        info!(
            "{} {} in {}",
            if pinned { "Pinned" } else { "Unpinned" },
            section,
            course
        );
        self.cache.invalidate(course);
        Ok(())
    }

    /// Change the display label; blank names clear it
    pub fn rename_section(
        &mut self,
        course: CourseId,
        section: SectionId,
        name: Option<String>,
    ) -> Result<()> {
        self.authorize(course)?;
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let mut tx = self.repo.begin(course)?;
        let tree = load_tree(&mut tx)?;
        if !tree.contains(section) {
            return Err(HierarchyError::NotFound(section));
        }
        tx.write_name(section, name.as_deref())?;
        tx.commit()?;

        debug!("Renamed {} in {} to {:?}", section, course, name);
        self.cache.invalidate(course);
        Ok(())
    }

    /// Rewrite a valid but out-of-order course into pre-order numbering
    ///
    /// Returns the number of rows whose number changed.
    pub fn normalize(&mut self, course: CourseId) -> Result<usize> {
        self.authorize(course)?;
        let mode = self.config.renumber;

        let mut tx = self.repo.begin(course)?;
        let tree = load_tree(&mut tx)?;
        let plan = reorder(&tree, None)?;
        let changed = apply_renumbering(&mut tx, &tree, &plan, mode)?;
        if changed == 0 {
            return Ok(0);
        }
        tx.commit()?;

        info!("Normalized {}: {} sections renumbered", course, changed);
        self.cache.invalidate(course);
        Ok(changed)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Reads
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Whether the move would be accepted and change the tree
    ///
    /// Storage failures count as "no".
    pub fn can_move(
        &mut self,
        course: CourseId,
        section: SectionId,
        new_parent: Option<SectionId>,
        before: Option<SectionId>,
    ) -> bool {
        let authorized = self.authorizer.can_edit(course);
        let tree = match self.tree(course) {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Cannot evaluate move in {}: {}", course, e);
                return false;
            }
        };
        let request = MoveRequest::new(section, new_parent, before);
        check_move(&tree, &request, authorized).is_allowed()
    }

    /// Direct children of `section`, in display order
    pub fn get_subsections(&mut self, course: CourseId, section: SectionId) -> Result<Vec<Section>> {
        let tree = self.tree(course)?;
        if !tree.contains(section) {
            return Err(HierarchyError::NotFound(section));
        }
        Ok(tree
            .children(section)
            .iter()
            .filter_map(|id| tree.section(*id))
            .cloned()
            .collect())
    }

    pub fn tree(&mut self, course: CourseId) -> Result<SectionTree> {
        let mut tx = self.repo.begin(course)?;
        load_tree(&mut tx)
    }

    /// Breadcrumb from the general section down to `section`
    pub fn section_path(&mut self, course: CourseId, section: SectionId) -> Result<Vec<Section>> {
        let tree = self.tree(course)?;
        if !tree.contains(section) {
            return Err(HierarchyError::NotFound(section));
        }
        let mut path: Vec<Section> = tree
            .ancestors(section)
            .iter()
            .filter_map(|id| tree.section(*id))
            .cloned()
            .collect();
        path.reverse();
        path.extend(tree.section(section).cloned());
        Ok(path)
    }

    pub fn is_effectively_visible(&mut self, course: CourseId, section: SectionId) -> Result<bool> {
        let tree = self.tree(course)?;
        if !tree.contains(section) {
            return Err(HierarchyError::NotFound(section));
        }
        Ok(tree.is_effectively_visible(section))
    }

    pub fn general_display(&mut self, course: CourseId) -> Result<GeneralSectionDisplay> {
        let mut tx = self.repo.begin(course)?;
        Ok(tx.load_general_display()?)
    }

    /// Report every broken invariant of the stored rows
    pub fn audit(&mut self, course: CourseId) -> Result<Vec<IntegrityViolation>> {
        let mut tx = self.repo.begin(course)?;
        let rows = tx.load_all()?;
        let violations = integrity::verify(&rows);
        for violation in &violations {
            warn!("Integrity violation in {}: {}", course, violation);
        }
        Ok(violations)
    }
}

fn load_tree<T: SectionTransaction>(tx: &mut T) -> Result<SectionTree> {
    let rows = tx.load_all()?;
    SectionTree::build(rows).map_err(|e| {
        warn!("Stored sections of {} are corrupted: {}", tx.course(), e);
        HierarchyError::from(e)
    })
}

/// Write new numbers, then rewrite parent references; returns rows renumbered
fn apply_renumbering<T: SectionTransaction>(
    tx: &mut T,
    tree: &SectionTree,
    plan: &Renumbering,
    mode: RenumberMode,
) -> Result<usize> {
    let changed = plan.changed_numbers(tree);
    let rewrites = plan.parent_rewrites(tree);
    debug!(
        "Renumbering {}: {} numbers, {} parent references ({})",
        tx.course(),
        changed.len(),
        rewrites.len(),
        mode
    );

    if mode == RenumberMode::TwoPhase {
        for (id, number) in &changed {
            tx.write_number(*id, -number)?;
        }
    }
    for (id, number) in &changed {
        tx.write_number(*id, *number)?;
    }
    for (id, parent) in &rewrites {
        tx.write_parent(*id, *parent)?;
    }
    Ok(changed.len())
}

fn apply_visibility<T: SectionTransaction>(tx: &mut T, changes: &[VisibilityChange]) -> Result<()> {
    for change in changes {
        tx.write_visibility(change.id, change.visible, change.visibleold)?;
    }
    Ok(())
}
