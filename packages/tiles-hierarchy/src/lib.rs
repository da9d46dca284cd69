//! Tiles Hierarchy - nested course sections on top of a flat section store
//!
//! Sections are stored as rows with a dense `number` and the `number` of their
//! parent. Every operation rebuilds the tree from those rows, plans the change
//! with pure functions and writes it back in one transaction:
//!
//! - [`tree`]: arena view of the rows
//! - [`validator`]: move checks (existence, cycles, sibling anchor, no-op)
//! - [`renumber`]: pre-order renumbering with an optional subtree graft
//! - [`visibility`]: hide/show propagation with restorable `visibleold`
//! - [`integrity`]: full audit of stored rows
//! - [`coordinator`]: transactional entry point
//!
//! ## Usage
//!
//! ```rust
//! use tiles_hierarchy::{HierarchyConfig, SectionCoordinator};
//! use tiles_storage::{CourseId, InMemorySectionStore};
//!
//! let course = CourseId(1);
//! let mut coord = SectionCoordinator::new(InMemorySectionStore::new(), HierarchyConfig::default()).unwrap();
//! coord.init_course(course).unwrap();
//!
//! let week = coord.create_section(course, None).unwrap();
//! assert_eq!(week, 1);
//!
//! let tree = coord.tree(course).unwrap();
//! let week_id = tree.id_at(week).unwrap();
//! assert_eq!(coord.create_section(course, Some(week_id)).unwrap(), 2);
//! assert_eq!(coord.get_subsections(course, week_id).unwrap().len(), 1);
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod integrity;
pub mod renumber;
pub mod tree;
pub mod validator;
pub mod visibility;

pub use config::{ConfigError, HierarchyConfig, RenumberMode};
pub use coordinator::{DeleteOutcome, SectionCoordinator};
pub use error::{Capacity, ErrorCategory, HierarchyError, Result};
pub use integrity::{verify, IntegrityViolation};
pub use renumber::{reorder, Graft, RenumberError, Renumbering};
pub use tree::{SectionTree, TreeError, TreeNode};
pub use validator::{can_move, check_move, MoveRejection, MoveRequest, MoveVerdict};
pub use visibility::{VisibilityChange, VisibilityError};
