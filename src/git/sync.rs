//! Revision synchronization.
//!
//! Brings a git working copy to the exact declared revision, either by
//! updating a checkout that already exists or by cloning a new one. Both
//! modes are idempotent: a second run with the same inputs leaves the same
//! commit checked out and reports [`SyncOutcome::UpToDate`].
//!
//! A revision may name a branch, a tag, or a raw commit id. It is resolved
//! against `origin/<rev>` first, then `refs/tags/<rev>`, then used literally.

use anyhow::Result;
use std::fmt;
use std::path::Path;

use crate::core::DepsyncError;
use crate::git::Vcs;
use crate::utils::fs::ensure_dir;

/// What a synchronization did to the working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A new working copy was created.
    Cloned {
        /// Commit checked out after the clone
        commit: Option<String>,
    },
    /// An existing working copy moved to a different commit.
    Updated {
        /// Commit before the update
        before: Option<String>,
        /// Commit after the update
        after: Option<String>,
    },
    /// An existing working copy was already at the declared revision.
    UpToDate {
        /// Commit checked out
        commit: Option<String>,
    },
    /// The update could not be applied; the existing local state is used.
    Stale {
        /// Commit left checked out
        commit: Option<String>,
        /// Why the update did not happen
        reason: String,
    },
}

impl SyncOutcome {
    /// The commit checked out once synchronization finished.
    #[must_use]
    pub fn commit(&self) -> Option<&str> {
        match self {
            Self::Cloned {
                commit,
            }
            | Self::UpToDate {
                commit,
            }
            | Self::Stale {
                commit,
                ..
            } => commit.as_deref(),
            Self::Updated {
                after, ..
            } => after.as_deref(),
        }
    }
}

fn short(commit: Option<&str>) -> &str {
    commit.map_or("unknown", |c| c.get(..8).unwrap_or(c))
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloned {
                commit,
            } => write!(f, "cloned at {}", short(commit.as_deref())),
            Self::Updated {
                before,
                after,
            } => write!(f, "{} -> {}", short(before.as_deref()), short(after.as_deref())),
            Self::UpToDate {
                commit,
            } => write!(f, "up to date at {}", short(commit.as_deref())),
            Self::Stale {
                commit,
                reason,
            } => write!(f, "kept {} ({reason})", short(commit.as_deref())),
        }
    }
}

/// Resolve `rev` to something `git checkout` accepts.
///
/// Remote branches win over tags; anything else is passed through so a raw
/// commit id still works.
pub async fn resolve_target(vcs: &dyn Vcs, dir: &Path, rev: &str) -> String {
    if vcs.ref_exists(dir, &format!("refs/remotes/origin/{rev}")).await {
        return format!("origin/{rev}");
    }
    if vcs.ref_exists(dir, &format!("refs/tags/{rev}")).await {
        return format!("refs/tags/{rev}");
    }
    rev.to_string()
}

/// Update an existing working copy in `dir` to `rev`.
///
/// Never fails: a fetch error is logged and the target is resolved from
/// whatever refs are already present, while a checkout or reset error yields
/// [`SyncOutcome::Stale`] carrying the commit actually checked out.
pub async fn sync_update(vcs: &dyn Vcs, dir: &Path, rev: &str, name: &str) -> SyncOutcome {
    let before = vcs.current_revision(dir).await;

    if let Err(e) = vcs.fetch_all(dir).await {
        tracing::warn!(target: "sync", "{name}: fetch failed, using local refs: {e:#}");
    }

    let target = resolve_target(vcs, dir, rev).await;
    tracing::debug!(target: "sync", "{name}: '{rev}' resolved to '{target}'");

    if let Err(e) = vcs.checkout(dir, &target).await {
        tracing::warn!(target: "sync", "{name}: could not move to '{rev}': {e:#}");
        return SyncOutcome::Stale {
            commit: before,
            reason: format!("{e:#}"),
        };
    }
    if let Err(e) = vcs.hard_reset(dir).await {
        // HEAD already moved; report where it is now
        tracing::warn!(target: "sync", "{name}: reset after checkout of '{rev}' failed: {e:#}");
        return SyncOutcome::Stale {
            commit: vcs.current_revision(dir).await,
            reason: format!("{e:#}"),
        };
    }

    let after = vcs.current_revision(dir).await;
    if after == before {
        SyncOutcome::UpToDate {
            commit: after,
        }
    } else {
        SyncOutcome::Updated {
            before,
            after,
        }
    }
}

/// Clone `url` at `rev` into `dst`.
///
/// A shallow single-branch clone is tried first. When `rev` is not a branch
/// or tag that fails, and a blob-filtered clone without checkout is made
/// instead, followed by a fetch and an explicit checkout of the resolved
/// revision.
///
/// # Errors
///
/// [`DepsyncError::GitCloneFailed`] when neither clone succeeds or the fetch
/// after the fallback clone fails, or
/// [`DepsyncError::GitCheckoutFailed`] when `rev` cannot be checked out.
pub async fn sync_clone(
    vcs: &dyn Vcs,
    url: &str,
    rev: &str,
    dst: &Path,
    name: &str,
) -> Result<SyncOutcome> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    let preexisting = dst.exists();

    match vcs.shallow_clone(url, rev, dst).await {
        Ok(()) => {
            return Ok(SyncOutcome::Cloned {
                commit: vcs.current_revision(dst).await,
            });
        }
        Err(e) => {
            tracing::debug!(target: "sync", "{name}: shallow clone of '{rev}' failed, retrying full: {e:#}");
        }
    }

    // A failed shallow clone may leave a partial directory behind
    if !preexisting && dst.exists() {
        if let Err(e) = std::fs::remove_dir_all(dst) {
            tracing::warn!(target: "sync", "{name}: could not remove partial clone {}: {e}", dst.display());
        }
    }

    if let Err(e) = vcs.filtered_no_checkout_clone(url, dst).await {
        if matches!(e.downcast_ref::<DepsyncError>(), Some(DepsyncError::GitNotFound)) {
            return Err(e);
        }
        return Err(DepsyncError::GitCloneFailed {
            url: url.to_string(),
            reason: format!("{e:#}"),
        }
        .into());
    }

    // No earlier state to fall back on, so a failed fetch is fatal here
    vcs.fetch_all(dst).await.map_err(|e| DepsyncError::GitCloneFailed {
        url: url.to_string(),
        reason: format!("{e:#}"),
    })?;

    let target = resolve_target(vcs, dst, rev).await;
    vcs.checkout(dst, &target).await.map_err(|e| DepsyncError::GitCheckoutFailed {
        reference: rev.to_string(),
        reason: format!("{e:#}"),
    })?;

    Ok(SyncOutcome::Cloned {
        commit: vcs.current_revision(dst).await,
    })
}
