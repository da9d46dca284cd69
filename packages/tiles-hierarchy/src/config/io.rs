//! Configuration file schema (YAML)

use super::HierarchyConfig;
use serde::{Deserialize, Serialize};

/// Versions this crate can read
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// YAML Schema v1
///
/// ```yaml
/// version: 1
/// hierarchy:
///   max_pinned: 4
///   max_sections: 52
///   renumber: two_phase
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileV1 {
    /// Schema version (always 1 for v1)
    pub version: Option<u32>,

    /// Engine settings; omitted means defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<HierarchyConfig>,
}
