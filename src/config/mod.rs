//! Run configuration.
//!
//! [`Settings`] is the single configuration object of a run. It is built once
//! at process start from, lowest precedence first:
//!
//! 1. built-in defaults ([`crate::constants`])
//! 2. the optional project file `depsync.toml` ([`ProjectConfig`])
//! 3. environment variables and command-line flags ([`SettingsArgs`], both
//!    handled by `clap`)
//!
//! and then shared read-only by the loader, resolver, and emitter.

mod project;

pub use project::{BuildConfig, ProjectConfig};

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_AGGREGATE_KEYS, DEFAULT_EXPORT_FILE, DEFAULT_LOCK_FILE, DEFAULT_OUTPUT_FILE,
    DEFAULT_OVERRIDE_FILE, GIT_FETCH_TIMEOUT, default_max_parallel,
};
use crate::utils::fs::absolutize;

/// Values supplied on the command line or through the environment.
///
/// Relative paths here are interpreted against the project root, like those
/// in `depsync.toml`.
#[derive(Debug, Clone, Default)]
pub struct SettingsArgs {
    /// `--lock` / `DEPSYNC_LOCK`
    pub lock: Option<PathBuf>,
    /// `--overrides` / `DEPSYNC_OVERRIDES`
    pub overrides: Option<PathBuf>,
    /// `--output` / `DEPSYNC_OUTPUT`
    pub output: Option<PathBuf>,
    /// `--max-parallel` / `DEPSYNC_MAX_PARALLEL`
    pub max_parallel: Option<usize>,
    /// `--fetch-timeout` / `DEPSYNC_FETCH_TIMEOUT`
    pub fetch_timeout_secs: Option<u64>,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Absolute project root; `dst` paths are relative to it
    pub root: PathBuf,
    /// Lock document with the declared libraries
    pub lock_path: PathBuf,
    /// Optional developer override document
    pub override_path: PathBuf,
    /// Generated make fragment
    pub output_path: PathBuf,
    /// Per-library metadata file name (`export.mk`)
    pub export_file: String,
    /// Upper bound on concurrent resolutions (at least 1)
    pub max_parallel: usize,
    /// Timeout applied to every clone and fetch
    pub fetch_timeout: Duration,
    /// Variable prefixes folded by the aggregation block
    pub aggregate_keys: Vec<String>,
}

impl Settings {
    /// Defaults for a project rooted at `root`.
    #[must_use]
    pub fn for_root(root: impl AsRef<Path>) -> Self {
        Self::resolve(root, &ProjectConfig::default(), &SettingsArgs::default())
    }

    /// Merge defaults, project configuration, and arguments.
    #[must_use]
    pub fn resolve(root: impl AsRef<Path>, project: &ProjectConfig, args: &SettingsArgs) -> Self {
        let root = root.as_ref().to_path_buf();
        let pick = |arg: &Option<PathBuf>, file: &Option<PathBuf>, default: &str| {
            let chosen = arg.clone().or_else(|| file.clone()).unwrap_or_else(|| default.into());
            absolutize(&root, &chosen)
        };

        let max_parallel = args
            .max_parallel
            .or(project.max_parallel)
            .unwrap_or_else(default_max_parallel)
            .max(1);
        let fetch_timeout = args
            .fetch_timeout_secs
            .or(project.fetch_timeout_secs)
            .map_or(GIT_FETCH_TIMEOUT, Duration::from_secs);

        Self {
            lock_path: pick(&args.lock, &project.lock, DEFAULT_LOCK_FILE),
            override_path: pick(&args.overrides, &project.overrides, DEFAULT_OVERRIDE_FILE),
            output_path: pick(&args.output, &project.output, DEFAULT_OUTPUT_FILE),
            export_file: project
                .export_file
                .clone()
                .unwrap_or_else(|| DEFAULT_EXPORT_FILE.to_string()),
            max_parallel,
            fetch_timeout,
            aggregate_keys: project.aggregate_keys.clone().unwrap_or_else(|| {
                DEFAULT_AGGREGATE_KEYS.iter().map(ToString::to_string).collect()
            }),
            root,
        }
    }
}
