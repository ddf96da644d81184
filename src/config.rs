use crate::error::PrepResult;
use serde::Deserialize;
use std::fs;
use std::path::Path;

// Configuration structure for column name mapping
#[derive(Debug, Clone)]
pub struct ColumnConfig {
    pub key: String,
    pub area: String,
    pub gages: String,
    pub waterbody: String,
}

impl ColumnConfig {
    pub fn new() -> Self {
        ColumnConfig {
            key: "id".to_string(),
            area: "areasqkm".to_string(),
            gages: "gage".to_string(),
            waterbody: "WaterbodyID".to_string(),
        }
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        ColumnConfig::new()
    }
}

fn default_pattern() -> String {
    "cat-*".to_string()
}

fn default_nts() -> usize {
    288
}

fn default_max_parse_threads() -> usize {
    8
}

/// Run settings, optionally loaded from a TOML file. CLI flags override
/// individual fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ForcingConfig {
    /// `cat-*` selects the per-catchment qlat ingestion path; the legacy
    /// nexus outputs use `nex-*` and are not handled here.
    #[serde(default = "default_pattern")]
    pub qlat_file_pattern_filter: String,

    /// Requested simulation step count for the run window.
    #[serde(default = "default_nts")]
    pub nts: usize,

    /// Cap on the parse worker pool, on top of the core count.
    #[serde(default = "default_max_parse_threads")]
    pub max_parse_threads: usize,
}

impl Default for ForcingConfig {
    fn default() -> Self {
        ForcingConfig {
            qlat_file_pattern_filter: default_pattern(),
            nts: default_nts(),
            max_parse_threads: default_max_parse_threads(),
        }
    }
}

impl ForcingConfig {
    pub fn load(path: &Path) -> PrepResult<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_select_the_catchment_path() {
        let config = ForcingConfig::default();
        assert_eq!(config.qlat_file_pattern_filter, "cat-*");
        assert_eq!(config.nts, 288);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "nts = 24").unwrap();

        let config = ForcingConfig::load(file.path()).unwrap();
        assert_eq!(config.nts, 24);
        assert_eq!(config.qlat_file_pattern_filter, "cat-*");
        assert_eq!(config.max_parse_threads, 8);
    }
}
