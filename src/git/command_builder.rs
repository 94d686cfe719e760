//! Type-safe Git command builder for consistent command execution
//!
//! This module provides a fluent API for building and executing Git commands,
//! so every call shares the same timeout handling, logging, and mapping of
//! failures onto [`DepsyncError`] variants.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::GIT_LOCAL_TIMEOUT;
use crate::core::DepsyncError;
use crate::utils::platform::get_git_command;

/// Builder for a single `git` invocation.
///
/// # Examples
///
/// ```rust,no_run
/// use depsync::git::command_builder::GitCommand;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let head = GitCommand::current_commit()
///     .current_dir(Path::new("lib/proto"))
///     .with_context("Proto")
///     .execute_stdout()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// # Default Configuration
///
/// - **Timeout**: [`GIT_LOCAL_TIMEOUT`]; network commands override it
/// - **Output capture**: stdout and stderr are always captured
/// - **Working directory**: passed to git with `-C` when set
#[derive(Debug, Clone)]
pub struct GitCommand {
    /// Command arguments to pass to Git (e.g., ["clone", "url", "path"])
    args: Vec<String>,

    /// Working directory, passed as `git -C <dir>`
    current_dir: Option<PathBuf>,

    /// Environment variables to set for the Git process
    env_vars: Vec<(String, String)>,

    /// Maximum duration to wait for command completion (None = no timeout)
    timeout_duration: Option<Duration>,

    /// Optional context string (library name) for log lines
    context: Option<String>,

    /// For clone commands, store the URL for better error messages
    clone_url: Option<String>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            // Never block on a credential prompt
            env_vars: vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())],
            timeout_duration: Some(GIT_LOCAL_TIMEOUT),
            context: None,
            clone_url: None,
        }
    }
}

impl GitCommand {
    /// Creates a new Git command builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run git inside `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set a custom timeout for the command (None for no timeout)
    #[must_use]
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Tag log lines with a library name.
    ///
    /// Resolutions run concurrently, so without this the debug log would
    /// interleave commands of different libraries anonymously.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Arguments as they will be passed to git, including `-C <dir>`.
    fn full_args(&self) -> Vec<String> {
        let mut full_args = Vec::with_capacity(self.args.len() + 2);
        if let Some(dir) = &self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.iter().cloned());
        full_args
    }

    fn log_prefix(&self) -> String {
        self.context.as_ref().map(|ctx| format!("({ctx}) ")).unwrap_or_default()
    }

    /// Execute the command and return the output
    ///
    /// # Errors
    ///
    /// - [`DepsyncError::GitCloneFailed`] when a clone exits non-zero
    /// - [`DepsyncError::GitCheckoutFailed`] when a checkout exits non-zero
    /// - [`DepsyncError::GitCommandError`] for any other non-zero exit or a timeout
    /// - an I/O error when git cannot be spawned
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let start = std::time::Instant::now();
        let git_command = get_git_command();
        let full_args = self.full_args();
        let prefix = self.log_prefix();

        let mut cmd = Command::new(git_command);
        cmd.args(&full_args);
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!(target: "git", "{}Executing command: {} {}", prefix, git_command, full_args.join(" "));

        let output_future = cmd.output();
        let output = if let Some(duration) = self.timeout_duration {
            if let Ok(result) = timeout(duration, output_future).await {
                result.with_context(|| format!("Failed to execute git {}", full_args.join(" ")))?
            } else {
                tracing::warn!(
                    target: "git",
                    "{}Command timed out after {} seconds: git {}",
                    prefix,
                    duration.as_secs(),
                    full_args.join(" ")
                );
                return Err(DepsyncError::GitCommandError {
                    operation: self.operation(),
                    stderr: format!(
                        "Git command timed out after {} seconds. This may indicate network \
                         connectivity issues or a remote that never answers.\n\
                         Try running the command manually: git {}",
                        duration.as_secs(),
                        full_args.join(" ")
                    ),
                }
                .into());
            }
        } else {
            output_future.await.with_context(|| format!("Failed to execute git {}", full_args.join(" ")))?
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "git",
                "{}Command failed with exit code {:?}: {}",
                prefix,
                output.status.code(),
                stderr.trim()
            );

            let error = match self.args.first().map(String::as_str) {
                Some("clone") => DepsyncError::GitCloneFailed {
                    url: self.clone_url.clone().unwrap_or_else(|| "unknown".to_string()),
                    reason: stderr,
                },
                Some("checkout") => DepsyncError::GitCheckoutFailed {
                    reference: self.args.last().cloned().unwrap_or_default(),
                    reason: stderr,
                },
                _ => DepsyncError::GitCommandError {
                    operation: self.operation(),
                    stderr: if stderr.is_empty() {
                        stdout
                    } else {
                        stderr
                    },
                },
            };
            return Err(error.into());
        }

        if !stdout.trim().is_empty() {
            tracing::trace!(target: "git", "{}{}", prefix, stdout.trim());
        }
        if !stderr.trim().is_empty() {
            tracing::debug!(target: "git", "{}{}", prefix, stderr.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(target: "git::perf", "{}Git {} took {:.2}s", prefix, self.operation(), elapsed.as_secs_f64());
        } else if elapsed.as_millis() > 100 {
            tracing::debug!(target: "git::perf", "{}Git {} took {}ms", prefix, self.operation(), elapsed.as_millis());
        }

        Ok(GitCommandOutput {
            stdout,
        })
    }

    /// Execute the command and return only stdout as a trimmed string
    ///
    /// # Errors
    ///
    /// See [`GitCommand::execute`].
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Execute the command and check for success
    ///
    /// # Errors
    ///
    /// See [`GitCommand::execute`].
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }

    fn operation(&self) -> String {
        self.args.first().cloned().unwrap_or_else(|| "unknown".to_string())
    }
}

/// Output from a Git command
#[derive(Debug, Clone)]
pub struct GitCommandOutput {
    /// Standard output from the Git command
    pub stdout: String,
}

// Convenience builders for the operations the synchronizer needs

impl GitCommand {
    /// `git clone --depth 1 --branch <rev> <url> <dst>`
    pub fn shallow_clone(url: &str, rev: &str, target: impl AsRef<Path>) -> Self {
        let mut cmd = Self::new().args([
            "clone",
            "--depth",
            "1",
            "--single-branch",
            "--branch",
            rev,
            url,
        ]);
        cmd = cmd.arg(target.as_ref().display().to_string());
        cmd.clone_url = Some(url.to_string());
        cmd
    }

    /// `git clone --filter=blob:none --no-checkout <url> <dst>`
    pub fn filtered_clone(url: &str, target: impl AsRef<Path>) -> Self {
        let mut cmd = Self::new()
            .args(["clone", "--filter=blob:none", "--no-checkout", url])
            .arg(target.as_ref().display().to_string());
        cmd.clone_url = Some(url.to_string());
        cmd
    }

    /// Fetch every branch and tag from `origin`, pruning stale references.
    pub fn fetch() -> Self {
        Self::new().args(["fetch", "--tags", "--force", "--prune", "origin"])
    }

    /// Force checkout, discarding conflicting local changes.
    pub fn checkout(target: &str) -> Self {
        Self::new().args(["checkout", "--force", target])
    }

    /// `git reset --hard`
    pub fn reset_hard() -> Self {
        Self::new().args(["reset", "--hard"])
    }

    /// Create a command to get the current commit hash
    pub fn current_commit() -> Self {
        Self::new().args(["rev-parse", "HEAD"])
    }

    /// Exact reference check; exits non-zero when the ref is absent.
    pub fn verify_ref(reference: &str) -> Self {
        Self::new().args(["show-ref", "--verify", "--quiet", reference])
    }
}
