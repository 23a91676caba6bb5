//! # Command-Line Interface
//!
//! User-facing commands over manifest files.
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `sort <MANIFEST>` | Print the order (index, rank, kind, name) and issues |
//! | `check <MANIFEST>` | Report issues, fail unless the result is complete |
//! | `graph <MANIFEST>` | Print the order constraints as DOT |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! The default can be changed with `[output] default_format` in
//! `depsort.toml`.
//!
//! ## Logging
//!
//! Logs go to stderr. `--verbose` enables debug logs, otherwise `RUST_LOG`
//! applies (default `warn`):
//! ```bash
//! depsort --verbose sort items.toml
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod order;
mod output;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
