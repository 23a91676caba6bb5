//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::order;
use super::output::{Output, OutputFormat};
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "depsort")]
#[command(author, version, about = "Deterministic dependency ordering with containers")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the configured format, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Configuration file to use instead of depsort.toml lookup
    #[arg(long, global = true, env = "DEPSORT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the sorted order of a manifest
    Sort {
        /// Manifest file (.toml, .json, .yaml)
        manifest: PathBuf,

        /// Order entries of the same rank by descending name
        #[arg(long)]
        reverse_names: bool,
    },

    /// Report structural issues of a manifest
    Check {
        /// Manifest file (.toml, .json, .yaml)
        manifest: PathBuf,
    },

    /// Print the order graph in DOT format
    Graph {
        /// Manifest file (.toml, .json, .yaml)
        manifest: PathBuf,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    if let Some(path) = &config.project_file {
        tracing::debug!(path = %path.display(), "loaded project config");
    }

    let format = cli
        .format
        .unwrap_or_else(|| config.output.default_format.into());
    let output = Output::new(format, config.output.show_ranks);

    match cli.command {
        Commands::Sort { manifest, reverse_names } => {
            let mut options = config.sort;
            options.reverse_names |= reverse_names;
            order::sort(&output, &manifest, &options)?
        }
        Commands::Check { manifest } => order::check(&output, &manifest, &config.sort)?,
        Commands::Graph { manifest } => order::graph(&output, &manifest, &config.sort)?,
    }

    tracing::debug!("command completed");
    Ok(())
}

/// Installs the stderr subscriber: debug when verbose, else RUST_LOG or warn
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
