//! Git capability used by the resolver.
//!
//! The resolver never shells out directly. It talks to a [`Vcs`]
//! implementation through seven narrow operations, which keeps the decision
//! logic testable with a simulated remote (see `test_utils::MockVcs`) and
//! keeps every subprocess in one place.
//!
//! [`GitCli`] is the production implementation. Like Cargo's
//! `git-fetch-with-cli`, it drives the system `git` binary, so SSH agents,
//! credential helpers, and `~/.gitconfig` all apply unchanged.
//!
//! [`sync`] builds the two synchronization modes (update an existing
//! checkout, clone a new one) on top of the trait.
//!
//! # Example
//!
//! ```rust,no_run
//! use depsync::git::{GitCli, Vcs};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let git = GitCli::new(Duration::from_secs(120));
//! let dst = Path::new("lib/proto");
//! if git.shallow_clone("https://example/proto.git", "v2.0", dst).await.is_err() {
//!     git.filtered_no_checkout_clone("https://example/proto.git", dst).await?;
//! }
//! println!("HEAD is {:?}", git.current_revision(dst).await);
//! # Ok(())
//! # }
//! ```

pub mod command_builder;
pub mod sync;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::git::command_builder::GitCommand;
use crate::utils::platform::ensure_git_available;

/// Version-control operations the resolver depends on.
///
/// Any `Err` is the unit of failure; callers decide whether it is fatal.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Commit id checked out in `dir`, or `None` when it cannot be read.
    async fn current_revision(&self, dir: &Path) -> Option<String>;

    /// Whether the fully-qualified `reference` (e.g. `refs/tags/v1`) exists in `dir`.
    async fn ref_exists(&self, dir: &Path, reference: &str) -> bool;

    /// Fetch all branches and tags from `origin`, pruning stale refs.
    async fn fetch_all(&self, dir: &Path) -> Result<()>;

    /// Force-checkout `target` in `dir`.
    async fn checkout(&self, dir: &Path, target: &str) -> Result<()>;

    /// Discard local modifications in `dir`.
    async fn hard_reset(&self, dir: &Path) -> Result<()>;

    /// Depth-1 single-branch clone of `url` at branch or tag `rev` into `dst`.
    async fn shallow_clone(&self, url: &str, rev: &str, dst: &Path) -> Result<()>;

    /// Blob-filtered clone of `url` into `dst` without checking anything out.
    async fn filtered_no_checkout_clone(&self, url: &str, dst: &Path) -> Result<()>;
}

/// [`Vcs`] backed by the system `git` binary.
///
/// Operations that can reach the network check for `git` on `PATH` first, so
/// a project made only of overrides and vendored copies works without git.
#[derive(Debug, Clone)]
pub struct GitCli {
    /// Timeout for clone and fetch
    network_timeout: Duration,
}

impl GitCli {
    /// Create a git driver whose network operations time out after `network_timeout`.
    #[must_use]
    pub const fn new(network_timeout: Duration) -> Self {
        Self {
            network_timeout,
        }
    }
}

/// Short label used to tag log lines with the directory being worked on.
fn label(dir: &Path) -> String {
    dir.file_name().map_or_else(|| dir.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[async_trait]
impl Vcs for GitCli {
    async fn current_revision(&self, dir: &Path) -> Option<String> {
        GitCommand::current_commit()
            .current_dir(dir)
            .with_context(label(dir))
            .execute_stdout()
            .await
            .ok()
            .filter(|commit| !commit.is_empty())
    }

    async fn ref_exists(&self, dir: &Path, reference: &str) -> bool {
        GitCommand::verify_ref(reference)
            .current_dir(dir)
            .with_context(label(dir))
            .execute_success()
            .await
            .is_ok()
    }

    async fn fetch_all(&self, dir: &Path) -> Result<()> {
        ensure_git_available()?;
        GitCommand::fetch()
            .current_dir(dir)
            .with_context(label(dir))
            .with_timeout(Some(self.network_timeout))
            .execute_success()
            .await
    }

    async fn checkout(&self, dir: &Path, target: &str) -> Result<()> {
        GitCommand::checkout(target).current_dir(dir).with_context(label(dir)).execute_success().await
    }

    async fn hard_reset(&self, dir: &Path) -> Result<()> {
        GitCommand::reset_hard().current_dir(dir).with_context(label(dir)).execute_success().await
    }

    async fn shallow_clone(&self, url: &str, rev: &str, dst: &Path) -> Result<()> {
        ensure_git_available()?;
        GitCommand::shallow_clone(url, rev, dst)
            .with_context(label(dst))
            .with_timeout(Some(self.network_timeout))
            .execute_success()
            .await
    }

    async fn filtered_no_checkout_clone(&self, url: &str, dst: &Path) -> Result<()> {
        ensure_git_available()?;
        GitCommand::filtered_clone(url, dst)
            .with_context(label(dst))
            .with_timeout(Some(self.network_timeout))
            .execute_success()
            .await
    }
}

/// Whether `dir` holds a git working copy (`.git` directory or file).
#[must_use]
pub fn is_git_checkout(dir: &Path) -> bool {
    dir.join(".git").exists()
}
