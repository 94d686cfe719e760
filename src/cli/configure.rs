//! `depsync configure`: resolve libraries and write the generated fragment.
//!
//! Runs the whole pipeline:
//!
//! 1. Load `depsync.toml` and merge it with flags and `DEPSYNC_*` variables
//! 2. Read `submodules_list.json` and `.submodules_local.json`
//! 3. Normalize declarations into records with symbolic keys
//! 4. Resolve every record to a directory (override, local path, git, vendored)
//! 5. Atomically rewrite `generated/third_party.mk`
//!
//! Any fatal error stops the run before step 5, so the previous fragment
//! stays in place.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::{CliConfig, project_root};
use crate::config::{ProjectConfig, Settings, SettingsArgs};
use crate::declaration::normalize;
use crate::emitter;
use crate::git::{GitCli, Vcs};
use crate::loader;
use crate::resolver::SourceResolver;
use crate::utils::progress::ProgressBar;

/// Resolve libraries and generate the build configuration.
#[derive(Args, Debug, Default)]
pub struct ConfigureCommand {
    /// Project root (defaults to the current directory)
    #[arg(long, env = "DEPSYNC_ROOT", value_name = "DIR")]
    root: Option<PathBuf>,

    /// Lock file declaring the libraries
    #[arg(long, env = "DEPSYNC_LOCK", value_name = "FILE")]
    lock: Option<PathBuf>,

    /// Developer override file
    #[arg(long, env = "DEPSYNC_OVERRIDES", value_name = "FILE")]
    overrides: Option<PathBuf>,

    /// Generated makefile fragment
    #[arg(long, env = "DEPSYNC_OUTPUT", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum number of libraries resolved concurrently
    #[arg(long, env = "DEPSYNC_MAX_PARALLEL", value_name = "NUM")]
    max_parallel: Option<usize>,

    /// Timeout in seconds for each clone or fetch
    #[arg(long, env = "DEPSYNC_FETCH_TIMEOUT", value_name = "SECS")]
    fetch_timeout: Option<u64>,
}

impl ConfigureCommand {
    fn settings_args(&self) -> SettingsArgs {
        SettingsArgs {
            lock: self.lock.clone(),
            overrides: self.overrides.clone(),
            output: self.output.clone(),
            max_parallel: self.max_parallel,
            fetch_timeout_secs: self.fetch_timeout,
        }
    }

    /// Run the pipeline with the system git.
    ///
    /// # Errors
    ///
    /// Any configuration, resolution, or write error.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let root = project_root(self.root.as_deref())?;
        let project = ProjectConfig::load(&root).await?;
        let settings = Settings::resolve(&root, &project, &self.settings_args());
        let vcs: Arc<dyn Vcs> = Arc::new(GitCli::new(settings.fetch_timeout));
        self.execute_with_vcs(settings, vcs, config).await
    }

    /// Run the pipeline against an explicit git backend.
    ///
    /// # Errors
    ///
    /// Any configuration, resolution, or write error.
    pub async fn execute_with_vcs(
        self,
        settings: Settings,
        vcs: Arc<dyn Vcs>,
        config: &CliConfig,
    ) -> Result<()> {
        let settings = Arc::new(settings);
        tracing::debug!("Project root: {}", settings.root.display());

        let (declarations, overrides) = loader::load(&settings).await?;
        let records = normalize(&declarations)?;
        tracing::debug!("{} libraries declared, {} overrides", records.len(), overrides.len());
        if !config.quiet && !overrides.is_empty() {
            let keys: Vec<&str> = overrides.raw_keys().collect();
            println!("{} overrides loaded: {}", "[info]".blue(), keys.join(", "));
        }

        let progress = ProgressBar::new(records.len() as u64, config.show_progress());
        progress.set_prefix("Resolving");

        let resolver =
            SourceResolver::new(Arc::clone(&settings), vcs, overrides).with_status(!config.quiet);
        let resolved = resolver.resolve_all(&records, &progress).await;
        progress.finish_and_clear();
        let resolved = resolved?;

        emitter::emit(&resolved, &settings)?;
        if !config.quiet {
            println!("{} {}", "Wrote".green().bold(), settings.output_path.display());
        }
        Ok(())
    }
}
