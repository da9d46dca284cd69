//! Engine configuration
//!
//! Defaults match a stock course: four pin slots, at most 52 sections besides
//! the general section, and placeholder-based renumbering for stores that
//! enforce unique section numbers.
//!
//! # Examples
//!
//! ```rust
//! use tiles_hierarchy::config::{HierarchyConfig, RenumberMode};
//!
//! let config = HierarchyConfig::default().max_pinned(6).max_sections(None);
//! assert!(config.validate().is_ok());
//! assert_eq!(config.renumber, RenumberMode::TwoPhase);
//!
//! let loaded = HierarchyConfig::from_yaml_str("version: 1\nhierarchy:\n  max_pinned: 2\n").unwrap();
//! assert_eq!(loaded.max_pinned, 2);
//! ```

pub mod error;
pub mod io;

pub use error::{ConfigError, ConfigResult};
pub use io::{ConfigFileV1, SUPPORTED_VERSIONS};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound accepted for `max_pinned`
pub const MAX_PINNED_LIMIT: usize = 16;

/// How new section numbers are written back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenumberMode {
    /// Negated placeholder first, then the real number.
    /// Required when the store enforces unique numbers.
    #[default]
    TwoPhase,
    /// Real number only; for stores without a uniqueness constraint
    SinglePass,
}

impl RenumberMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TwoPhase => "two_phase",
            Self::SinglePass => "single_pass",
        }
    }
}

impl std::fmt::Display for RenumberMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hierarchy engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HierarchyConfig {
    /// Pinned slots per course
    pub max_pinned: usize,
    /// Sections per course excluding the general section; `None` = unlimited
    pub max_sections: Option<usize>,
    pub renumber: RenumberMode,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_pinned: 4,
            max_sections: Some(52),
            renumber: RenumberMode::TwoPhase,
        }
    }
}

impl HierarchyConfig {
    pub fn max_pinned(mut self, max_pinned: usize) -> Self {
        self.max_pinned = max_pinned;
        self
    }

    pub fn max_sections(mut self, max_sections: Option<usize>) -> Self {
        self.max_sections = max_sections;
        self
    }

    pub fn renumber(mut self, mode: RenumberMode) -> Self {
        self.renumber = mode;
        self
    }

    /// Range checks
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_pinned == 0 || self.max_pinned > MAX_PINNED_LIMIT {
            return Err(ConfigError::range(
                "max_pinned",
                self.max_pinned,
                1,
                MAX_PINNED_LIMIT,
                "Pinned tiles share one highlight row; keep it small.",
            ));
        }
        if self.max_sections == Some(0) {
            return Err(ConfigError::range(
                "max_sections",
                0,
                1,
                usize::MAX,
                "Use null for an unlimited number of sections.",
            ));
        }
        Ok(())
    }

    /// Load and validate a YAML configuration file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;
        match file.version {
            None => return Err(ConfigError::MissingVersion),
            Some(v) if !SUPPORTED_VERSIONS.contains(&v) => {
                return Err(ConfigError::UnsupportedVersion {
                    found: v,
                    supported: SUPPORTED_VERSIONS.to_vec(),
                })
            }
            Some(_) => {}
        }

        let config = file.hierarchy.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let file = ConfigFileV1 {
            version: Some(1),
            hierarchy: Some(self.clone()),
        };
        Ok(serde_yaml::to_string(&file)?)
    }
}
