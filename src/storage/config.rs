//! Configuration handling for depsort
//!
//! Configuration is read from `depsort.toml` (project, found by walking up
//! from the current directory) and `~/.config/depsort/config.toml` (global).
//! Project values win over global ones; command-line flags win over both.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::SortOptions;

/// File name of the project configuration
pub const PROJECT_CONFIG_FILE: &str = "depsort.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Format used when `--format` is not given
    pub default_format: OutputFormat,

    /// Show the rank column in text output
    pub show_ranks: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: OutputFormat::Text,
            show_ranks: true,
        }
    }
}

/// Contents of one configuration file. Every key is optional so that a
/// project file only overrides what it sets.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigFile {
    pub sort: Option<SortSection>,
    pub output: Option<OutputSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SortSection {
    pub reverse_names: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct OutputSection {
    pub default_format: Option<OutputFormat>,
    pub show_ranks: Option<bool>,
}

/// Effective configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub sort: SortOptions,
    pub output: OutputConfig,
    /// Project configuration file that was applied, if any
    pub project_file: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations, or from `explicit` when given
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(global) = Self::load_global()? {
            config.apply(&global);
        }

        let project_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_project_file(),
        };

        if let Some(path) = project_path {
            let file = Self::read_file(&path)?;
            config.apply(&file);
            config.project_file = Some(path);
        }

        Ok(config)
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "depsort", "depsort").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads the global configuration file, if present
    fn load_global() -> Result<Option<ConfigFile>> {
        let config_path = match Self::global_config_dir() {
            Some(dir) => dir.join("config.toml"),
            None => return Ok(None),
        };

        if !config_path.exists() {
            return Ok(None);
        }

        Self::read_file(&config_path).map(Some)
    }

    /// Reads and parses one configuration file
    pub fn read_file(path: &Path) -> Result<ConfigFile> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Finds `depsort.toml` in the current directory or one of its parents
    pub fn find_project_file() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_file_from(&current)
    }

    /// Finds `depsort.toml` in `start` or one of its parents
    pub fn find_project_file_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(PROJECT_CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Overlays the keys set in `file`
    pub fn apply(&mut self, file: &ConfigFile) {
        if let Some(sort) = &file.sort {
            if let Some(reverse_names) = sort.reverse_names {
                self.sort.reverse_names = reverse_names;
            }
        }

        if let Some(output) = &file.output {
            if let Some(format) = output.default_format {
                self.output.default_format = format;
            }
            if let Some(show_ranks) = output.show_ranks {
                self.output.show_ranks = show_ranks;
            }
        }
    }
}
