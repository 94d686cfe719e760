//! Common test utilities for depsync integration tests
//!
//! Every test gets a throwaway layout:
//!
//! ```text
//! <tmp>/project/   project root, where depsync runs
//! <tmp>/sources/   upstream git repositories
//! ```

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::{Context, Result};
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub use depsync::test_utils::TestGit;

/// Test project with a root directory and a place for upstream repositories.
pub struct TestProject {
    _temp_dir: TempDir, // Keep alive for RAII cleanup
    project_dir: PathBuf,
    sources_dir: PathBuf,
}

impl TestProject {
    /// Create an empty project
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().join("project");
        let sources_dir = temp_dir.path().join("sources");
        fs::create_dir_all(&project_dir)?;
        fs::create_dir_all(&sources_dir)?;

        Ok(Self {
            _temp_dir: temp_dir,
            project_dir,
            sources_dir,
        })
    }

    /// Get the project directory path
    pub fn project_path(&self) -> &Path {
        &self.project_dir
    }

    /// Get the sources directory path
    pub fn sources_path(&self) -> &Path {
        &self.sources_dir
    }

    /// Path of the generated fragment
    pub fn output_path(&self) -> PathBuf {
        self.project_dir.join("generated/third_party.mk")
    }

    /// Read the generated fragment
    pub fn read_output(&self) -> Result<String> {
        fs::read_to_string(self.output_path()).context("Failed to read generated fragment")
    }

    /// Write `submodules_list.json`
    pub fn write_lock(&self, content: &str) -> Result<()> {
        self.write_file("submodules_list.json", content)
    }

    /// Write `.submodules_local.json`
    pub fn write_overrides(&self, content: &str) -> Result<()> {
        self.write_file(".submodules_local.json", content)
    }

    /// Write any file relative to the project root
    pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let file = self.project_dir.join(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file, content).with_context(|| format!("Failed to write {}", file.display()))
    }

    /// Create an upstream repository with `export.mk`, committed on `main`
    /// and tagged `tag`. Returns the repository and the tagged commit.
    pub fn create_source_repo(&self, name: &str, tag: &str) -> Result<(TestGit, String)> {
        TestGit::upstream(&self.sources_dir.join(name), tag)
    }

    /// URL for a source repository that git clones but depsync does not treat
    /// as a local reference (relative to the project root).
    pub fn source_url(&self, name: &str) -> String {
        format!("../sources/{name}")
    }

    /// Run depsync in the project directory
    pub fn run_depsync(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::cargo_bin("depsync")?
            .args(args)
            .current_dir(&self.project_dir)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("DEPSYNC_ROOT")
            .output()
            .context("Failed to run depsync")?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }

    /// Run `depsync --no-progress configure`
    pub fn configure(&self) -> Result<CommandOutput> {
        self.run_depsync(&["--no-progress", "configure"])
    }
}

/// Command output helper
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Assert the command succeeded
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success,
            "Command failed with code {:?}\nStdout: {}\nStderr: {}",
            self.code, self.stdout, self.stderr
        );
        self
    }

    /// Assert the command failed
    pub fn assert_failure(&self) -> &Self {
        assert!(!self.success, "Command unexpectedly succeeded\nStdout: {}", self.stdout);
        self
    }

    /// Assert stdout contains the given text
    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Expected stdout to contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    /// Assert stderr contains the given text
    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Expected stderr to contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}
