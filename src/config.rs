//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.listenscope.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".listenscope.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Gatherer settings.
    #[serde(default)]
    pub gatherer: GathererConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "listeners_report.md".to_string()
}

/// Settings of the event listener gatherer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GathererConfig {
    /// Selector enumerating the elements to inspect. Must reach into
    /// shadow roots.
    #[serde(default = "default_element_selector")]
    pub element_selector: String,

    /// Object group remote objects are created in.
    #[serde(default = "default_object_group")]
    pub object_group: String,
}

impl Default for GathererConfig {
    fn default() -> Self {
        Self {
            element_selector: default_element_selector(),
            object_group: default_object_group(),
        }
    }
}

fn default_element_selector() -> String {
    "body /deep/ *".to_string()
}

fn default_object_group() -> String {
    "event-listeners-gatherer".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the event type summary table.
    #[serde(default = "default_true")]
    pub include_summary: bool,

    /// Show the listener flags (capture, passive, once) in tables.
    #[serde(default = "default_true")]
    pub include_flags: bool,

    /// Maximum listeners listed per pass in Markdown; 0 lists all.
    #[serde(default)]
    pub max_listeners_per_pass: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_summary: true,
            include_flags: true,
            max_listeners_per_pass: 0,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.listenscope.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Apply explicit overrides. Only values that are set replace the
    /// configuration file's settings.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(ref selector) = overrides.element_selector {
            self.gatherer.element_selector = selector.clone();
        }
        if let Some(ref group) = overrides.object_group {
            self.gatherer.object_group = group.clone();
        }
        if let Some(ref output) = overrides.output {
            self.general.output = output.clone();
        }
        if let Some(max) = overrides.max_listeners_per_pass {
            self.report.max_listeners_per_pass = max;
        }

        // Flags always override
        if overrides.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Values that take precedence over the configuration file, usually from
/// the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub element_selector: Option<String>,
    pub object_group: Option<String>,
    pub output: Option<String>,
    pub max_listeners_per_pass: Option<usize>,
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gatherer.element_selector, "body /deep/ *");
        assert_eq!(config.gatherer.object_group, "event-listeners-gatherer");
        assert!(config.report.include_summary);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom.json"
verbose = true

[gatherer]
element_selector = "main *"

[report]
max_listeners_per_pass = 25
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "custom.json");
        assert!(config.general.verbose);
        assert_eq!(config.gatherer.element_selector, "main *");
        assert_eq!(config.gatherer.object_group, "event-listeners-gatherer");
        assert_eq!(config.report.max_listeners_per_pass, 25);
        assert!(config.report.include_flags);
    }

    #[test]
    fn test_overrides_only_replace_set_values() {
        let mut config = Config::default();
        config.gatherer.object_group = "from-file".to_string();

        config.apply_overrides(&Overrides {
            element_selector: Some("section *".to_string()),
            verbose: true,
            ..Overrides::default()
        });

        assert_eq!(config.gatherer.element_selector, "section *");
        assert_eq!(config.gatherer.object_group, "from-file");
        assert!(config.general.verbose);
    }

    #[test]
    fn test_load_from_dir() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[gatherer]\nobject_group = \"mine\"\n",
        )
        .unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.gatherer.object_group, "mine");
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[gatherer\n").unwrap();

        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[gatherer]"));
        assert!(toml_str.contains("[report]"));
    }
}
