//! Command-line interface for depsync.
//!
//! # Available Commands
//!
//! - `configure` - resolve every declared library and write the generated
//!   makefile fragment
//! - `build` - run the firmware build that consumes the fragment
//!
//! # Global Options
//!
//! All commands support these global options:
//! - `--verbose` - Enable debug output
//! - `--quiet` - Suppress all output except errors
//! - `--no-progress` - Disable the progress bar
//!
//! # Example
//!
//! ```bash
//! # Resolve libraries, then build
//! depsync configure
//! depsync build --jobs 8
//!
//! # CI: plain output, custom lock file
//! depsync --no-progress configure --lock ci/submodules_list.json
//! ```

mod build;
mod configure;

pub use build::BuildCommand;
pub use configure::ConfigureCommand;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::utils::fs::absolutize;

/// Output settings shared by every command.
///
/// Derived once from the global flags so commands don't need to look at
/// the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Default tracing filter when `RUST_LOG` is not set
    pub log_level: String,
    /// Whether to draw the progress bar
    pub no_progress: bool,
    /// Whether to suppress status lines
    pub quiet: bool,
}

impl CliConfig {
    /// Whether the progress bar may be shown.
    #[must_use]
    pub const fn show_progress(&self) -> bool {
        !self.no_progress && !self.quiet
    }
}

/// Resolve third-party libraries for a firmware build.
#[derive(Parser)]
#[command(
    name = "depsync",
    about = "Resolve third-party libraries and generate build configuration",
    version,
    long_about = "depsync maps the libraries declared in submodules_list.json to local directories \
                  (developer overrides, local paths, git checkouts, or vendored copies) and writes \
                  a makefile fragment binding each one for the firmware build."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (equivalent to `RUST_LOG=debug`).
    ///
    /// Shows every git command with its timing. Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable the progress bar.
    ///
    /// The bar is also hidden automatically when stderr is not a terminal.
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every declared library and write the generated fragment
    Configure(ConfigureCommand),

    /// Run the firmware build
    Build(BuildCommand),
}

impl Cli {
    /// Output settings derived from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
            quiet: self.quiet,
        }
    }

    /// Run the selected command and return the process exit code.
    ///
    /// # Errors
    ///
    /// Any fatal error of the command; the caller turns it into a diagnostic.
    pub async fn execute_with_config(self, config: &CliConfig) -> Result<i32> {
        match self.command {
            Commands::Configure(cmd) => cmd.execute(config).await.map(|()| 0),
            Commands::Build(cmd) => cmd.execute(config).await,
        }
    }
}

/// Absolute project root: `--root`/`DEPSYNC_ROOT`, or the working directory.
pub(crate) fn project_root(root: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to determine the current directory")?;
    Ok(root.map_or_else(|| cwd.clone(), |root| absolutize(&cwd, root)))
}
