//! `depsync build`: run the firmware build that consumes the fragment.
//!
//! Equivalent to `make -rR -j16 -f STM32Make.make all` in the project root.
//! Every part of the invocation can come from a flag, from the `[build]`
//! table of `depsync.toml`, or from the defaults, in that order. The build
//! inherits the terminal and its exit status becomes ours.

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::cli::{CliConfig, project_root};
use crate::config::{BuildConfig, ProjectConfig};
use crate::constants::{DEFAULT_BUILD_JOBS, DEFAULT_BUILD_TARGET, DEFAULT_MAKE, DEFAULT_MAKEFILE};
use crate::core::DepsyncError;

/// Run the firmware build.
#[derive(Args, Debug, Default)]
pub struct BuildCommand {
    /// Project root (defaults to the current directory)
    #[arg(long, env = "DEPSYNC_ROOT", value_name = "DIR")]
    root: Option<PathBuf>,

    /// Makefile passed with `-f`
    #[arg(long, value_name = "FILE")]
    makefile: Option<PathBuf>,

    /// Parallel jobs passed with `-j`
    #[arg(short, long, value_name = "NUM")]
    jobs: Option<usize>,

    /// Make target
    #[arg(long)]
    target: Option<String>,

    /// Build program
    #[arg(long, value_name = "PROGRAM")]
    make: Option<String>,
}

/// Fully resolved build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocation {
    /// Program to run
    pub program: String,
    /// Arguments passed to it
    pub args: Vec<String>,
}

impl BuildCommand {
    /// Merge flags over `[build]` settings and defaults.
    #[must_use]
    pub fn invocation(&self, config: &BuildConfig) -> BuildInvocation {
        let makefile = self
            .makefile
            .clone()
            .or_else(|| config.makefile.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MAKEFILE));
        let jobs = self.jobs.or(config.jobs).unwrap_or(DEFAULT_BUILD_JOBS).max(1);
        let target = self
            .target
            .clone()
            .or_else(|| config.target.clone())
            .unwrap_or_else(|| DEFAULT_BUILD_TARGET.to_string());
        let program =
            self.make.clone().or_else(|| config.make.clone()).unwrap_or_else(|| DEFAULT_MAKE.to_string());

        BuildInvocation {
            program,
            args: vec![
                "-rR".to_string(),
                format!("-j{jobs}"),
                "-f".to_string(),
                makefile.display().to_string(),
                target,
            ],
        }
    }

    /// Run the build and return its exit code.
    ///
    /// # Errors
    ///
    /// [`DepsyncError::BuildSpawnFailed`] when the build program cannot be
    /// started, or a configuration error from `depsync.toml`.
    pub async fn execute(self, config: &CliConfig) -> Result<i32> {
        let root = project_root(self.root.as_deref())?;
        let project = ProjectConfig::load(&root).await?;
        let invocation = self.invocation(&project.build);
        run(&invocation, &root, config).await
    }
}

async fn run(invocation: &BuildInvocation, root: &Path, config: &CliConfig) -> Result<i32> {
    tracing::debug!("Running {} {} in {}", invocation.program, invocation.args.join(" "), root.display());
    if !config.quiet {
        eprintln!("{} {}", invocation.program, invocation.args.join(" "));
    }

    let status = Command::new(&invocation.program)
        .args(&invocation.args)
        .current_dir(root)
        .status()
        .await
        .map_err(|e| DepsyncError::BuildSpawnFailed {
            program: invocation.program.clone(),
            reason: e.to_string(),
        })?;

    // Killed by a signal: no code, report a generic failure
    Ok(status.code().unwrap_or(1))
}
