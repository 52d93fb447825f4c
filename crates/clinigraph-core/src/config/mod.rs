//! Configuration management

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::knowledge::GROUP_FINAL;
use crate::storage::{ASSOCIATIONS_FILE, CONCEPTS_FILE, SNAPSHOT_FILE};

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "CLINIGRAPH_CONFIG_DIR";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "CLINIGRAPH_DATA_DIR";

/// Largest ascent depth accepted for case subgraphs
pub const MAX_DEPTH_LIMIT: u32 = 64;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graph: GraphConfig,
    pub records: RecordsConfig,
    pub associations: AssociationsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Snapshot file; defaults to `graph.json` in the data directory
    pub snapshot_path: Option<PathBuf>,
    pub default_max_depth: u32,
    pub sample_node_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// Directory of the JSONL tables; defaults to `records/` in the data directory
    pub dir: Option<PathBuf>,
    pub concepts_file: String,
    pub associations_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationsConfig {
    /// Group counted when no `--group` is given; `none` counts every group
    #[serde(with = "group_setting")]
    pub default_group: Option<i32>,
}

impl Default for AssociationsConfig {
    fn default() -> Self {
        Self {
            default_group: Some(GROUP_FINAL),
        }
    }
}

/// Parse a group filter: a group code, or `none` (or empty) for every group
pub fn parse_group(value: &str) -> anyhow::Result<Option<i32>> {
    match value.trim() {
        "" | "none" => Ok(None),
        group => Ok(Some(
            group
                .parse()
                .with_context(|| format!("Invalid group code: {}", value))?,
        )),
    }
}

/// TOML has no null, so "every group" is stored as `"none"`
mod group_setting {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Code(i32),
        Name(String),
    }

    pub fn serialize<S>(value: &Option<i32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(code) => Repr::Code(*code),
            None => Repr::Name("none".to_string()),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => Ok(Some(code)),
            Repr::Name(name) if name == "none" => Ok(None),
            Repr::Name(name) => Err(D::Error::custom(format!("invalid group code: {}", name))),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            default_max_depth: 2,
            sample_node_limit: 30,
        }
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            concepts_file: CONCEPTS_FILE.to_string(),
            associations_file: ASSOCIATIONS_FILE.to_string(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("clinigraph")
        };
        Ok(dir)
    }

    /// Get the data directory path (snapshot and records defaults)
    pub fn data_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(DATA_DIR_ENV) {
            PathBuf::from(custom_dir)
        } else {
            dirs::data_dir()
                .ok_or_else(|| anyhow!("Could not determine data directory"))?
                .join("clinigraph")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or use defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.graph.default_max_depth > MAX_DEPTH_LIMIT {
            return Err(anyhow!(
                "graph.default_max_depth must be at most {}",
                MAX_DEPTH_LIMIT
            ));
        }
        if self.graph.sample_node_limit == 0 {
            return Err(anyhow!("graph.sample_node_limit must be positive"));
        }
        if self.records.concepts_file.trim().is_empty()
            || self.records.associations_file.trim().is_empty()
        {
            return Err(anyhow!("Record file names must not be empty"));
        }
        Ok(())
    }

    /// Snapshot location, falling back to the data directory
    pub fn snapshot_path(&self) -> anyhow::Result<PathBuf> {
        match &self.graph.snapshot_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join(SNAPSHOT_FILE)),
        }
    }

    /// Record directory, falling back to the data directory
    pub fn records_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.records.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::data_dir()?.join("records")),
        }
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            // Graph settings
            "graph.snapshot_path" => Ok(display_path(&self.graph.snapshot_path)),
            "graph.default_max_depth" => Ok(self.graph.default_max_depth.to_string()),
            "graph.sample_node_limit" => Ok(self.graph.sample_node_limit.to_string()),

            // Record store settings
            "records.dir" => Ok(display_path(&self.records.dir)),
            "records.concepts_file" => Ok(self.records.concepts_file.clone()),
            "records.associations_file" => Ok(self.records.associations_file.clone()),

            // Association settings
            "associations.default_group" => Ok(self
                .associations
                .default_group
                .map(|g| g.to_string())
                .unwrap_or_else(|| "(none)".to_string())),

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `clinigraph config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            // Graph settings
            "graph.snapshot_path" => {
                self.graph.snapshot_path = optional_path(value);
            }
            "graph.default_max_depth" => {
                let depth: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid default_max_depth value: {}", value))?;
                if depth > MAX_DEPTH_LIMIT {
                    return Err(anyhow!("Max depth must be between 0 and {}", MAX_DEPTH_LIMIT));
                }
                self.graph.default_max_depth = depth;
            }
            "graph.sample_node_limit" => {
                let limit: usize = value
                    .parse()
                    .with_context(|| format!("Invalid sample_node_limit value: {}", value))?;
                if limit == 0 {
                    return Err(anyhow!("Sample node limit must be positive"));
                }
                self.graph.sample_node_limit = limit;
            }

            // Record store settings
            "records.dir" => {
                self.records.dir = optional_path(value);
            }
            "records.concepts_file" | "records.associations_file" => {
                let name = value.trim();
                if name.is_empty() {
                    return Err(anyhow!("Record file names must not be empty"));
                }
                if key == "records.concepts_file" {
                    self.records.concepts_file = name.to_string();
                } else {
                    self.records.associations_file = name.to_string();
                }
            }

            // Association settings
            "associations.default_group" => {
                self.associations.default_group = parse_group(value)?;
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `clinigraph config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = vec![
            "graph.snapshot_path",
            "graph.default_max_depth",
            "graph.sample_node_limit",
            "records.dir",
            "records.concepts_file",
            "records.associations_file",
            "associations.default_group",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(default)".to_string())
}

fn optional_path(value: &str) -> Option<PathBuf> {
    match value.trim() {
        "" | "default" => None,
        path => Some(PathBuf::from(path)),
    }
}
