//! Manifest files describing items to sort
//!
//! A manifest holds a list of [`ItemDefinition`]s in TOML, JSON or YAML,
//! selected by file extension.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ItemDefinition, ItemHandle};

#[derive(Debug, Error, PartialEq)]
pub enum ManifestError {
    #[error("Unsupported manifest format: '{0}' (expected .toml, .json, .yaml or .yml)")]
    UnsupportedFormat(String),

    #[error("Failed to parse {format} manifest: {message}")]
    Parse {
        format: ManifestFormat,
        message: String,
    },
}

/// Serialization format of a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Toml,
    Json,
    Yaml,
}

impl ManifestFormat {
    /// Picks the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "toml" => Ok(ManifestFormat::Toml),
            "json" => Ok(ManifestFormat::Json),
            "yaml" | "yml" => Ok(ManifestFormat::Yaml),
            _ => Err(ManifestError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestFormat::Toml => "toml",
            ManifestFormat::Json => "json",
            ManifestFormat::Yaml => "yaml",
        }
    }
}

impl std::fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Items loaded from a manifest file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub items: Vec<Arc<ItemDefinition>>,
}

impl Manifest {
    /// Reads and parses a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let format = ManifestFormat::from_path(path)?;
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

        Self::parse(&content, format)
            .with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    /// Parses manifest content in the given format
    pub fn parse(content: &str, format: ManifestFormat) -> Result<Self, ManifestError> {
        let parse_error = |message: String| ManifestError::Parse { format, message };

        match format {
            ManifestFormat::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
            ManifestFormat::Json => {
                serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))
            }
            ManifestFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))
            }
        }
    }

    /// Handles of the top-level items
    pub fn handles(&self) -> Vec<ItemHandle> {
        self.items
            .iter()
            .map(|def| {
                let handle: ItemHandle = def.clone();
                handle
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
