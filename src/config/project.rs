//! Optional per-project configuration (`depsync.toml`).
//!
//! Every key is optional; a missing file is the same as an empty one.
//!
//! ```toml
//! lock = "deps/submodules_list.json"
//! output = "build/third_party.mk"
//! max-parallel = 4
//! fetch-timeout-secs = 300
//! aggregate-keys = ["INNER_PROTO", "MPU9250_LIB"]
//!
//! [build]
//! makefile = "STM32Make.make"
//! jobs = 8
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::constants::PROJECT_CONFIG_FILE;
use crate::core::DepsyncError;

/// Contents of `depsync.toml`.
///
/// Relative paths are interpreted against the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectConfig {
    /// Lock file path
    pub lock: Option<PathBuf>,
    /// Override file path
    pub overrides: Option<PathBuf>,
    /// Generated fragment path
    pub output: Option<PathBuf>,
    /// Name of the per-library metadata file
    pub export_file: Option<String>,
    /// Concurrent resolutions
    pub max_parallel: Option<usize>,
    /// Timeout for clone/fetch, in seconds
    pub fetch_timeout_secs: Option<u64>,
    /// Variable prefixes folded by the aggregation block
    pub aggregate_keys: Option<Vec<String>>,
    /// Settings for `depsync build`
    #[serde(default)]
    pub build: BuildConfig,
}

/// `[build]` table of `depsync.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BuildConfig {
    /// Makefile passed with `-f`
    pub makefile: Option<PathBuf>,
    /// Parallel jobs passed with `-j`
    pub jobs: Option<usize>,
    /// Make target
    pub target: Option<String>,
    /// Build program (defaults to `make`)
    pub make: Option<String>,
}

impl ProjectConfig {
    /// Load `depsync.toml` from the project root, or defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns [`DepsyncError::ConfigParse`] for invalid TOML or unknown keys,
    /// and an I/O error when the file exists but cannot be read.
    pub async fn load(root: &Path) -> Result<Self> {
        let path = root.join(PROJECT_CONFIG_FILE);
        if !path.exists() {
            tracing::debug!("No {} at {}", PROJECT_CONFIG_FILE, root.display());
            return Ok(Self::default());
        }
        Self::load_from(&path).await
    }

    /// Load a configuration file from an explicit path.
    ///
    /// # Errors
    ///
    /// See [`ProjectConfig::load`].
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read project config from {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            DepsyncError::ConfigParse {
                file: path.display().to_string(),
                reason: e.message().to_string(),
            }
            .into()
        })
    }
}
