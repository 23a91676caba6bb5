//! # Storage Layer
//!
//! File-backed inputs of the command-line tool. The sorting engine itself
//! never touches the filesystem.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Items | TOML, JSON or YAML (by extension) | any path given on the command line |
//! | Project config | TOML | `depsort.toml` in the current directory or a parent |
//! | Global config | TOML | platform config dir, `depsort/config.toml` |
//!
//! ## Key Types
//!
//! - [`Manifest`] - Item definitions loaded from a file
//! - [`Config`] - Layered global and project configuration

mod manifest;
mod config;

pub use manifest::{Manifest, ManifestError, ManifestFormat};
pub use config::{Config, ConfigError, ConfigFile, OutputConfig, OutputFormat, PROJECT_CONFIG_FILE};
