use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Setting outside its accepted range
    #[error("hierarchy.{field} = {value} is out of range ({min}..={max}). {hint}")]
    Range {
        field: &'static str,
        value: usize,
        min: usize,
        max: usize,
        hint: &'static str,
    },

    #[error("config file has no 'version' key; start it with 'version: 1'")]
    MissingVersion,

    #[error("config version {found} is not supported (known: {})", list_versions(supported))]
    UnsupportedVersion { found: u32, supported: Vec<u32> },

    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    pub fn range(
        field: &'static str,
        value: usize,
        min: usize,
        max: usize,
        hint: &'static str,
    ) -> Self {
        Self::Range {
            field,
            value,
            min,
            max,
            hint,
        }
    }
}

fn list_versions(versions: &[u32]) -> String {
    versions
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type ConfigResult<T> = Result<T, ConfigError>;
