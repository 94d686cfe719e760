//! In-memory [`Vcs`] that simulates remotes and working copies.
//!
//! Clones create a real `<dst>/.git` directory (and optionally `export.mk`)
//! so filesystem checks in the resolver behave exactly as with real git, but
//! no subprocess is ever spawned. Every call is recorded and can be
//! inspected with [`MockVcs::calls`].

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::constants::DEFAULT_EXPORT_FILE;
use crate::git::Vcs;

#[derive(Debug, Default)]
struct Remote {
    branches: HashMap<String, String>,
    tags: HashMap<String, String>,
    commits: HashSet<String>,
    export: bool,
}

#[derive(Debug)]
struct Checkout {
    url: String,
    head: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    remotes: HashMap<String, Remote>,
    checkouts: HashMap<PathBuf, Checkout>,
    failing_urls: HashSet<String>,
    fail_fetch: bool,
    fail_reset: bool,
    calls: Vec<String>,
}

/// Simulated git backend for resolver and synchronizer tests.
#[derive(Debug, Clone, Default)]
pub struct MockVcs {
    state: Arc<Mutex<State>>,
}

/// Builder returned by [`MockVcs::add_remote`].
pub struct RemoteBuilder<'a> {
    vcs: &'a MockVcs,
    url: String,
}

impl RemoteBuilder<'_> {
    /// Add a branch pointing at `commit`.
    pub fn branch(&self, name: &str, commit: &str) -> &Self {
        self.update(|remote| {
            remote.branches.insert(name.to_string(), commit.to_string());
            remote.commits.insert(commit.to_string());
        })
    }

    /// Add a tag pointing at `commit`.
    pub fn tag(&self, name: &str, commit: &str) -> &Self {
        self.update(|remote| {
            remote.tags.insert(name.to_string(), commit.to_string());
            remote.commits.insert(commit.to_string());
        })
    }

    /// Add a commit reachable only by its id.
    pub fn commit(&self, commit: &str) -> &Self {
        self.update(|remote| {
            remote.commits.insert(commit.to_string());
        })
    }

    /// Whether checkouts of this remote contain `export.mk`.
    pub fn with_export(&self, export: bool) -> &Self {
        self.update(|remote| remote.export = export)
    }

    fn update(&self, f: impl FnOnce(&mut Remote)) -> &Self {
        let mut state = self.vcs.lock();
        f(state.remotes.entry(self.url.clone()).or_default());
        self
    }
}

impl MockVcs {
    /// Create a backend with no remotes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("mock vcs state poisoned")
    }

    /// Register a remote at `url` and return a builder for its refs.
    pub fn add_remote(&self, url: &str) -> RemoteBuilder<'_> {
        self.lock().remotes.entry(url.to_string()).or_default();
        RemoteBuilder {
            vcs: self,
            url: url.to_string(),
        }
    }

    /// Pretend `dir` is an existing clone of `url` with `head` checked out.
    ///
    /// Creates `dir/.git` on disk.
    pub fn add_checkout(&self, dir: &Path, url: &str, head: Option<&str>) {
        std::fs::create_dir_all(dir.join(".git")).expect("create fake .git");
        self.lock().checkouts.insert(
            dir.to_path_buf(),
            Checkout {
                url: url.to_string(),
                head: head.map(str::to_string),
            },
        );
    }

    /// Make every clone of `url` fail.
    pub fn fail_url(&self, url: &str) {
        self.lock().failing_urls.insert(url.to_string());
    }

    /// Make every fetch fail.
    pub fn fail_fetch(&self, fail: bool) {
        self.lock().fail_fetch = fail;
    }

    /// Make every hard reset fail after the checkout has moved HEAD.
    pub fn fail_reset(&self, fail: bool) {
        self.lock().fail_reset = fail;
    }

    /// Recorded calls, formatted as `"<operation> <arguments>"`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of calls that would have touched the network.
    #[must_use]
    pub fn network_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| {
                c.starts_with("shallow_clone")
                    || c.starts_with("filtered_no_checkout_clone")
                    || c.starts_with("fetch_all")
            })
            .count()
    }

    /// Commit currently checked out in `dir`, if it is a known checkout.
    #[must_use]
    pub fn head(&self, dir: &Path) -> Option<String> {
        self.lock().checkouts.get(dir).and_then(|c| c.head.clone())
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }

    fn materialize(dst: &Path, export: bool) -> Result<()> {
        std::fs::create_dir_all(dst.join(".git"))?;
        if export {
            std::fs::write(dst.join(DEFAULT_EXPORT_FILE), "# exported\n")?;
        }
        Ok(())
    }
}

#[async_trait]
impl Vcs for MockVcs {
    async fn current_revision(&self, dir: &Path) -> Option<String> {
        self.record(format!("current_revision {}", dir.display()));
        self.head(dir)
    }

    async fn ref_exists(&self, dir: &Path, reference: &str) -> bool {
        self.record(format!("ref_exists {} {reference}", dir.display()));
        let state = self.lock();
        let Some(remote) = state.checkouts.get(dir).and_then(|c| state.remotes.get(&c.url)) else {
            return false;
        };
        if let Some(branch) = reference.strip_prefix("refs/remotes/origin/") {
            remote.branches.contains_key(branch)
        } else if let Some(tag) = reference.strip_prefix("refs/tags/") {
            remote.tags.contains_key(tag)
        } else {
            false
        }
    }

    async fn fetch_all(&self, dir: &Path) -> Result<()> {
        self.record(format!("fetch_all {}", dir.display()));
        if self.lock().fail_fetch {
            bail!("fatal: unable to access origin");
        }
        Ok(())
    }

    async fn checkout(&self, dir: &Path, target: &str) -> Result<()> {
        self.record(format!("checkout {} {target}", dir.display()));
        let mut state = self.lock();
        let url = state
            .checkouts
            .get(dir)
            .map(|c| c.url.clone())
            .ok_or_else(|| anyhow!("not a git repository: {}", dir.display()))?;
        let remote = state.remotes.get(&url).ok_or_else(|| anyhow!("unknown remote {url}"))?;

        let commit = if let Some(branch) = target.strip_prefix("origin/") {
            remote.branches.get(branch).cloned()
        } else if let Some(tag) = target.strip_prefix("refs/tags/") {
            remote.tags.get(tag).cloned()
        } else {
            remote.commits.get(target).cloned()
        };
        let Some(commit) = commit else {
            bail!("error: pathspec '{target}' did not match any file(s) known to git");
        };
        let export = remote.export;

        if let Some(checkout) = state.checkouts.get_mut(dir) {
            checkout.head = Some(commit);
        }
        drop(state);
        Self::materialize(dir, export)
    }

    async fn hard_reset(&self, dir: &Path) -> Result<()> {
        self.record(format!("hard_reset {}", dir.display()));
        if self.lock().fail_reset {
            bail!("fatal: Unable to create '{}/.git/index.lock': File exists", dir.display());
        }
        Ok(())
    }

    async fn shallow_clone(&self, url: &str, rev: &str, dst: &Path) -> Result<()> {
        self.record(format!("shallow_clone {url} {rev} {}", dst.display()));
        let mut state = self.lock();
        if state.failing_urls.contains(url) {
            bail!("fatal: repository '{url}' not found");
        }
        let remote = state.remotes.get(url).ok_or_else(|| anyhow!("fatal: repository '{url}' not found"))?;
        let Some(commit) = remote.branches.get(rev).or_else(|| remote.tags.get(rev)).cloned() else {
            // Like git, a failed clone may leave its target behind
            drop(state);
            std::fs::create_dir_all(dst)?;
            std::fs::write(dst.join("PARTIAL"), "")?;
            bail!("fatal: Remote branch {rev} not found in upstream origin");
        };
        let export = remote.export;

        state.checkouts.insert(
            dst.to_path_buf(),
            Checkout {
                url: url.to_string(),
                head: Some(commit),
            },
        );
        drop(state);
        Self::materialize(dst, export)
    }

    async fn filtered_no_checkout_clone(&self, url: &str, dst: &Path) -> Result<()> {
        self.record(format!("filtered_no_checkout_clone {url} {}", dst.display()));
        let mut state = self.lock();
        if state.failing_urls.contains(url) || !state.remotes.contains_key(url) {
            bail!("fatal: repository '{url}' not found");
        }
        state.checkouts.insert(
            dst.to_path_buf(),
            Checkout {
                url: url.to_string(),
                head: None,
            },
        );
        drop(state);
        Self::materialize(dst, false)
    }
}
