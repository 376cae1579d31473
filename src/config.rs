//! Directive markers and output settings, loaded from directives.toml.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::extent::BlockScan;

// Embed the TOML file directly in the binary at compile time
const DIRECTIVES_TOML: &str = include_str!("../directives.toml");

/// Marker text for each directive kind
#[derive(Debug, Clone, Deserialize)]
pub struct MarkerConfig {
    pub add_line: String,
    pub remove_line: String,
    pub remove_block: String,
    /// Must begin the (left-trimmed) line, unlike the other markers
    pub test_section: String,
}

/// First-generation marker spellings, off unless asked for
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyConfig {
    pub enabled: bool,
    pub add_line: String,
    pub remove_line: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Appended to the original file name to form the backup path
    pub backup_suffix: String,
    /// Prefix for injected lines
    pub inject_indent: String,
    pub block_scan: BlockScan,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub markers: MarkerConfig,
    pub legacy: LegacyConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load the embedded defaults, with an optional user file merged on top.
    pub fn load(user_path: Option<&Path>) -> Result<Self> {
        let mut table: toml::Table =
            toml::from_str(DIRECTIVES_TOML).context("Failed to parse embedded directives.toml")?;

        if let Some(path) = user_path {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let user: toml::Table = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            merge_tables(&mut table, user);
        }

        let config: Config = toml::Value::Table(table)
            .try_into()
            .context("Invalid directive configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults only
    pub fn embedded() -> Result<Self> {
        Self::load(None)
    }

    /// Reject settings that would make every line match a directive
    pub fn validate(&self) -> Result<()> {
        let mut markers = vec![
            ("markers.add_line", &self.markers.add_line),
            ("markers.remove_line", &self.markers.remove_line),
            ("markers.remove_block", &self.markers.remove_block),
            ("markers.test_section", &self.markers.test_section),
        ];
        if self.legacy.enabled {
            markers.push(("legacy.add_line", &self.legacy.add_line));
            markers.push(("legacy.remove_line", &self.legacy.remove_line));
        }
        for (key, marker) in markers {
            if marker.trim().is_empty() {
                anyhow::bail!("Marker '{}' must not be empty", key);
            }
        }
        if self.output.backup_suffix.is_empty() {
            anyhow::bail!("output.backup_suffix must not be empty");
        }
        Ok(())
    }
}

/// Recursively overlay `overlay` onto `base`. Nested tables merge key by key,
/// everything else is replaced.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
