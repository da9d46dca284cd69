//! Section domain models
//!
//! A course stores its sections as a flat list. Each row carries a dense
//! positional `number` and the `number` of its structural parent; the tree is
//! reconstructed from these back-references on demand.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of the permanent general section.
pub const GENERAL_SECTION: i64 = 0;

/// Course identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseId(pub i64);

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "course#{}", self.0)
    }
}

/// Stable section identifier.
///
/// Assigned once at creation and never reused. This is the only handle that
/// survives renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId(pub i64);

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "section#{}", self.0)
    }
}

/// One stored section row
///
/// # Examples
///
/// ```rust
/// use tiles_storage::domain::{Section, SectionId};
///
/// let section = Section::new(SectionId(10), 3, 1);
/// assert!(section.visible);
/// assert!(section.visibleold);
/// assert!(!section.pinned);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Stable identifier
    pub id: SectionId,
    /// Position in the flat order (unique per course)
    pub number: i64,
    /// Number of the structural parent, `0` for top level
    pub parent: i64,
    /// Stored visibility
    pub visible: bool,
    /// Visibility to restore when a hidden ancestor is shown again
    pub visibleold: bool,
    /// Promoted into a pinned slot
    pub pinned: bool,
    /// Display label
    #[serde(default)]
    pub name: Option<String>,
}

impl Section {
    /// Create a visible, unpinned, unnamed section row
    pub fn new(id: SectionId, number: i64, parent: i64) -> Self {
        Self {
            id,
            number,
            parent,
            visible: true,
            visibleold: true,
            pinned: false,
            name: None,
        }
    }

    pub fn is_general(&self) -> bool {
        self.number == GENERAL_SECTION
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self.visibleold = false;
        self
    }
}

/// Row to insert; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSection {
    pub number: i64,
    pub parent: i64,
    pub visible: bool,
    pub visibleold: bool,
    pub name: Option<String>,
}

impl NewSection {
    pub fn new(number: i64, parent: i64) -> Self {
        Self {
            number,
            parent,
            visible: true,
            visibleold: true,
            name: None,
        }
    }
}

/// Display marker for the general section.
///
/// Section 0 is never hidden in storage; "hiding" it only records this
/// course-level marker for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneralSectionDisplay {
    /// Never set; renderer applies its own default
    #[default]
    Default,
    Shown,
    Hidden,
}

impl GeneralSectionDisplay {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Shown => "shown",
            Self::Hidden => "hidden",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "shown" => Some(Self::Shown),
            "hidden" => Some(Self::Hidden),
            _ => None,
        }
    }
}

impl fmt::Display for GeneralSectionDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
