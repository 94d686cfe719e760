//! Source resolution.
//!
//! Decides, for every declared library, where its sources come from and
//! produces the directory the generated makefile will point at. The first
//! matching strategy wins:
//!
//! 1. **Override** - an entry in `.submodules_local.json`
//! 2. **Local reference** - a `local:`, `path:`, `file://` or absolute `url`
//! 3. **Git update** - `dst` already holds a git working copy
//! 4. **Vendored copy** - `dst` holds `export.mk` but no `.git`
//! 5. **Fresh clone** - anything else
//!
//! Overrides and local references must point at existing directories; a
//! broken one is fatal rather than silently falling through.
//!
//! # Parallelism
//!
//! Libraries are grouped by destination directory. Groups run concurrently
//! (bounded by `max_parallel`), libraries within a group run in declared
//! order, so two tasks never touch the same checkout. Results land in their
//! declared slot, and the first fatal error cancels the remaining work.

use anyhow::Result;
use colored::Colorize;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Settings;
use crate::core::DepsyncError;
use crate::declaration::DependencyRecord;
use crate::git::sync::{SyncOutcome, sync_clone, sync_update};
use crate::git::{Vcs, is_git_checkout};
use crate::overrides::OverrideMap;
use crate::utils::fs::absolutize;
use crate::utils::progress::ProgressBar;

/// How a library's directory was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Developer override from `.submodules_local.json`
    Override,
    /// `url` names a directory on this machine
    LocalReference,
    /// Existing checkout brought to the declared revision
    GitUpdate,
    /// Pre-materialized copy without version control
    VendoredCopy,
    /// New clone at the declared revision
    FreshClone,
}

/// A library paired with the directory chosen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    /// The normalized declaration
    pub record: DependencyRecord,
    /// Absolute directory bound to `<KEY>_DIR`
    pub dir: PathBuf,
    /// Strategy that produced `dir`
    pub strategy: Strategy,
    /// Synchronization result for git-backed strategies
    pub sync: Option<SyncOutcome>,
    /// Whether `dir` contains the exported build metadata
    pub has_export: bool,
}

impl ResolvedDependency {
    /// One colored status line for the terminal.
    #[must_use]
    pub fn status_line(&self) -> String {
        let name = &self.record.name;
        let dir = self.dir.display();
        match (self.strategy, &self.sync) {
            (Strategy::Override, _) => format!("{} {name} -> {dir}", "[override]".magenta()),
            (Strategy::LocalReference, _) => format!("{} {name} -> {dir}", "[local-url]".blue()),
            (Strategy::VendoredCopy, _) => format!("{} {name} -> {dir}", "[vendored]".cyan()),
            (_, Some(outcome @ SyncOutcome::UpToDate { .. })) => {
                format!("{} {name} {outcome}", "[up-to-date]".green())
            }
            (_, Some(outcome @ SyncOutcome::Stale { .. })) => {
                format!("{} {name} {outcome}", "[warn]".yellow().bold())
            }
            (Strategy::FreshClone, outcome) => format!(
                "{} {name}@{} {}",
                "[fetch]".green().bold(),
                self.record.rev,
                outcome.as_ref().map(ToString::to_string).unwrap_or_default()
            ),
            (Strategy::GitUpdate, outcome) => format!(
                "{} {name} {}",
                "[update]".green().bold(),
                outcome.as_ref().map(ToString::to_string).unwrap_or_default()
            ),
        }
    }
}

/// Recognize a local `url` and return the directory it names.
///
/// `local:` and `path:` may carry a relative path, resolved against `root`.
#[must_use]
pub fn local_reference_path(url: &str, root: &Path) -> Option<PathBuf> {
    let raw = url
        .strip_prefix("local:")
        .or_else(|| url.strip_prefix("path:"))
        .or_else(|| url.strip_prefix("file://"))
        .or_else(|| url.starts_with('/').then_some(url))?;
    Some(absolutize(root, Path::new(raw)))
}

/// Resolves libraries to directories, cloning and updating as needed.
pub struct SourceResolver {
    settings: Arc<Settings>,
    vcs: Arc<dyn Vcs>,
    overrides: OverrideMap,
    show_status: bool,
}

impl SourceResolver {
    /// Create a resolver; status lines are printed unless disabled with
    /// [`SourceResolver::with_status`].
    pub fn new(settings: Arc<Settings>, vcs: Arc<dyn Vcs>, overrides: OverrideMap) -> Self {
        Self {
            settings,
            vcs,
            overrides,
            show_status: true,
        }
    }

    /// Enable or disable the per-library status lines.
    #[must_use]
    pub const fn with_status(mut self, show_status: bool) -> Self {
        self.show_status = show_status;
        self
    }

    /// Resolve one library.
    ///
    /// # Errors
    ///
    /// - [`DepsyncError::OverrideNotFound`] for an override that is not a directory
    /// - [`DepsyncError::LocalPathNotFound`] for a local `url` that is not a directory
    /// - [`DepsyncError::GitCloneFailed`] or [`DepsyncError::GitCheckoutFailed`]
    ///   when a fresh clone cannot be made
    pub async fn resolve(&self, record: &DependencyRecord) -> Result<ResolvedDependency> {
        let root = &self.settings.root;

        let (dir, strategy, sync) = if let Some(entry) = self.overrides.lookup(record) {
            if !entry.path.is_dir() {
                return Err(DepsyncError::OverrideNotFound {
                    name: record.name.clone(),
                    path: entry.path.display().to_string(),
                }
                .into());
            }
            tracing::debug!("{}: override '{}'", record.name, entry.raw_key);
            (entry.path.clone(), Strategy::Override, None)
        } else if let Some(path) = local_reference_path(&record.url, root) {
            if !path.is_dir() {
                return Err(DepsyncError::LocalPathNotFound {
                    name: record.name.clone(),
                    path: path.display().to_string(),
                }
                .into());
            }
            (path, Strategy::LocalReference, None)
        } else {
            let dst = absolutize(root, Path::new(&record.dst));
            if is_git_checkout(&dst) {
                let outcome = sync_update(self.vcs.as_ref(), &dst, &record.rev, &record.name).await;
                (dst, Strategy::GitUpdate, Some(outcome))
            } else if dst.join(&self.settings.export_file).is_file() {
                (dst, Strategy::VendoredCopy, None)
            } else {
                let outcome =
                    sync_clone(self.vcs.as_ref(), &record.url, &record.rev, &dst, &record.name)
                        .await?;
                (dst, Strategy::FreshClone, Some(outcome))
            }
        };

        let has_export = dir.join(&self.settings.export_file).is_file();
        Ok(ResolvedDependency {
            record: record.clone(),
            dir,
            strategy,
            sync,
            has_export,
        })
    }

    /// Resolve every library, returning results in declared order.
    ///
    /// # Errors
    ///
    /// The first fatal error of any [`SourceResolver::resolve`] call; no
    /// partial result is returned.
    pub async fn resolve_all(
        &self,
        records: &[DependencyRecord],
        progress: &ProgressBar,
    ) -> Result<Vec<ResolvedDependency>> {
        let groups = self.group_by_destination(records);
        tracing::debug!(
            "Resolving {} libraries in {} groups (max {} in parallel)",
            records.len(),
            groups.len(),
            self.settings.max_parallel
        );

        let finished: Vec<Vec<(usize, ResolvedDependency)>> = stream::iter(groups)
            .map(|indices| async move {
                let mut done = Vec::with_capacity(indices.len());
                for index in indices {
                    let record = &records[index];
                    progress.set_message(record.name.clone());
                    let resolved = self.resolve(record).await?;
                    self.report(&resolved, progress);
                    progress.inc(1);
                    done.push((index, resolved));
                }
                Ok::<_, anyhow::Error>(done)
            })
            .buffer_unordered(self.settings.max_parallel)
            .try_collect()
            .await?;

        let mut slots: Vec<Option<ResolvedDependency>> = vec![None; records.len()];
        for (index, resolved) in finished.into_iter().flatten() {
            slots[index] = Some(resolved);
        }
        Ok(slots.into_iter().flatten().collect())
    }

    /// Indices of `records` grouped by absolute destination, groups in
    /// first-seen order.
    fn group_by_destination(&self, records: &[DependencyRecord]) -> Vec<Vec<usize>> {
        let mut positions: HashMap<PathBuf, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let dst = absolutize(&self.settings.root, Path::new(&record.dst));
            match positions.get(&dst) {
                Some(&group) => groups[group].push(index),
                None => {
                    positions.insert(dst, groups.len());
                    groups.push(vec![index]);
                }
            }
        }
        groups
    }

    fn report(&self, resolved: &ResolvedDependency, progress: &ProgressBar) {
        if !resolved.has_export {
            tracing::warn!(
                "{}: {} not found in {}",
                resolved.record.name,
                self.settings.export_file,
                resolved.dir.display()
            );
        }
        if !self.show_status {
            return;
        }
        progress.println(resolved.status_line());
        if !resolved.has_export {
            progress.println(format!(
                "{} {}: {} not found in {}; the build may miss its sources",
                "[warn]".yellow().bold(),
                resolved.record.name,
                self.settings.export_file,
                resolved.dir.display()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{RawDeclarations, normalize};
    use crate::test_utils::MockVcs;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const URL: &str = "https://example/proto.git";

    fn records(libs: serde_json::Value) -> Vec<DependencyRecord> {
        let raw = RawDeclarations::from_libs(Some(libs), Path::new("lock.json")).unwrap();
        normalize(&raw).unwrap()
    }

    fn proto() -> Vec<DependencyRecord> {
        records(json!([{ "name": "Proto", "url": URL, "rev": "v2.0", "dst": "lib/proto" }]))
    }

    fn vcs() -> Arc<MockVcs> {
        let vcs = MockVcs::new();
        vcs.add_remote(URL).branch("main", "aaaa1111").tag("v2.0", "bbbb2222").with_export(true);
        Arc::new(vcs)
    }

    fn resolver(root: &Path, vcs: &Arc<MockVcs>, overrides: OverrideMap) -> SourceResolver {
        let mut settings = Settings::for_root(root);
        settings.max_parallel = 4;
        SourceResolver::new(Arc::new(settings), vcs.clone(), overrides).with_status(false)
    }

    fn typed(err: &anyhow::Error) -> &DepsyncError {
        err.downcast_ref::<DepsyncError>().expect("typed error")
    }

    #[test]
    fn test_local_reference_prefixes() {
        let root = Path::new("/project");
        assert_eq!(local_reference_path("local:vendor/x", root), Some(PathBuf::from("/project/vendor/x")));
        assert_eq!(local_reference_path("path:/opt/x", root), Some(PathBuf::from("/opt/x")));
        assert_eq!(local_reference_path("file:///opt/x", root), Some(PathBuf::from("/opt/x")));
        assert_eq!(local_reference_path("/opt/x", root), Some(PathBuf::from("/opt/x")));
        assert_eq!(local_reference_path("https://example/x.git", root), None);
        assert_eq!(local_reference_path("git@host:x.git", root), None);
        assert_eq!(local_reference_path("ssh://host/x", root), None);
    }

    #[tokio::test]
    async fn test_fresh_clone_pins_tag() {
        let temp = TempDir::new().unwrap();
        let vcs = vcs();
        let resolver = resolver(temp.path(), &vcs, OverrideMap::new());

        let resolved = resolver.resolve(&proto()[0]).await.unwrap();
        let dst = temp.path().join("lib/proto");
        assert_eq!(resolved.strategy, Strategy::FreshClone);
        assert_eq!(resolved.dir, dst);
        assert!(resolved.has_export);
        assert_eq!(vcs.head(&dst).as_deref(), Some("bbbb2222"));
    }

    #[tokio::test]
    async fn test_override_wins_without_network() {
        let temp = TempDir::new().unwrap();
        let vendor = temp.path().join("opt/vendor/proto");
        fs::create_dir_all(&vendor).unwrap();
        let vcs = vcs();
        let overrides =
            OverrideMap::from_pairs([("PROTO", vendor.to_str().unwrap())], temp.path()).unwrap();
        let resolver = resolver(temp.path(), &vcs, overrides);

        let resolved = resolver.resolve(&proto()[0]).await.unwrap();
        assert_eq!(resolved.strategy, Strategy::Override);
        assert_eq!(resolved.dir, vendor);
        assert!(vcs.calls().is_empty());
    }

    #[tokio::test]
    async fn test_broken_override_is_fatal() {
        let temp = TempDir::new().unwrap();
        let vcs = vcs();
        let overrides = OverrideMap::from_pairs([("Proto", "/definitely/not/here")], temp.path()).unwrap();
        let resolver = resolver(temp.path(), &vcs, overrides);

        let err = resolver.resolve(&proto()[0]).await.unwrap_err();
        assert!(matches!(typed(&err), DepsyncError::OverrideNotFound { name, .. } if name == "Proto"));
        assert_eq!(vcs.network_calls(), 0);
    }

    #[tokio::test]
    async fn test_local_reference() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("checkouts/proto");
        fs::create_dir_all(&local).unwrap();
        fs::write(local.join("export.mk"), "").unwrap();
        let vcs = vcs();
        let resolver = resolver(temp.path(), &vcs, OverrideMap::new());

        let record = &records(json!([{
            "name": "Proto", "url": local.to_str().unwrap(), "rev": "v2.0", "dst": "lib/proto"
        }]))[0];
        let resolved = resolver.resolve(record).await.unwrap();
        assert_eq!(resolved.strategy, Strategy::LocalReference);
        assert_eq!(resolved.dir, local);
        assert!(vcs.calls().is_empty());

        let missing = &records(json!([{
            "name": "Proto", "url": "path:nowhere", "rev": "v2.0", "dst": "lib/proto"
        }]))[0];
        let err = resolver.resolve(missing).await.unwrap_err();
        assert!(matches!(typed(&err), DepsyncError::LocalPathNotFound { .. }));
    }

    #[tokio::test]
    async fn test_vendored_copy_is_used_as_is() {
        let temp = TempDir::new().unwrap();
        let dst = temp.path().join("lib/proto");
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("export.mk"), "").unwrap();
        let vcs = vcs();
        let resolver = resolver(temp.path(), &vcs, OverrideMap::new());

        let resolved = resolver.resolve(&proto()[0]).await.unwrap();
        assert_eq!(resolved.strategy, Strategy::VendoredCopy);
        assert!(vcs.calls().is_empty());
    }

    #[tokio::test]
    async fn test_existing_checkout_is_updated_then_up_to_date() {
        let temp = TempDir::new().unwrap();
        let dst = temp.path().join("lib/proto");
        let vcs = vcs();
        vcs.add_checkout(&dst, URL, Some("aaaa1111"));
        let resolver = resolver(temp.path(), &vcs, OverrideMap::new());

        let first = resolver.resolve(&proto()[0]).await.unwrap();
        assert_eq!(first.strategy, Strategy::GitUpdate);
        assert!(matches!(first.sync, Some(SyncOutcome::Updated { .. })));

        let second = resolver.resolve(&proto()[0]).await.unwrap();
        assert!(matches!(second.sync, Some(SyncOutcome::UpToDate { .. })));
        assert_eq!(vcs.head(&dst).as_deref(), Some("bbbb2222"));
    }

    #[tokio::test]
    async fn test_missing_export_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        let vcs = Arc::new(MockVcs::new());
        vcs.add_remote(URL).tag("v2.0", "bbbb2222").with_export(false);
        let resolver = resolver(temp.path(), &vcs, OverrideMap::new());

        let resolved = resolver.resolve(&proto()[0]).await.unwrap();
        assert!(!resolved.has_export);
    }

    #[tokio::test]
    async fn test_resolve_all_keeps_declared_order() {
        let temp = TempDir::new().unwrap();
        let vcs = Arc::new(MockVcs::new());
        let mut libs = Vec::new();
        for i in 0..12 {
            let url = format!("https://example/lib{i}.git");
            vcs.add_remote(&url).tag("v1", &format!("{i:04}")).with_export(true);
            libs.push(json!({ "name": format!("lib{i}"), "url": url, "rev": "v1", "dst": format!("lib/{i}") }));
        }
        let records = records(serde_json::Value::Array(libs));
        let resolver = resolver(temp.path(), &vcs, OverrideMap::new());

        let resolved = resolver.resolve_all(&records, &ProgressBar::hidden()).await.unwrap();
        let names: Vec<&str> = resolved.iter().map(|r| r.record.name.as_str()).collect();
        let expected: Vec<String> = (0..12).map(|i| format!("lib{i}")).collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_resolve_all_fails_on_first_fatal_error() {
        let temp = TempDir::new().unwrap();
        let vcs = vcs();
        vcs.add_remote("https://example/broken.git");
        vcs.fail_url("https://example/broken.git");
        let records = records(json!([
            { "name": "Proto", "url": URL, "rev": "v2.0", "dst": "lib/proto" },
            { "name": "Broken", "url": "https://example/broken.git", "rev": "v1", "dst": "lib/broken" }
        ]));
        let resolver = resolver(temp.path(), &vcs, OverrideMap::new());

        let err = resolver.resolve_all(&records, &ProgressBar::hidden()).await.unwrap_err();
        assert!(matches!(typed(&err), DepsyncError::GitCloneFailed { .. }));
    }

    #[test]
    fn test_groups_share_destination() {
        let resolver = resolver(Path::new("/p"), &vcs(), OverrideMap::new());
        let records = records(json!([
            { "name": "a", "url": "u", "rev": "r", "dst": "lib/x" },
            { "name": "b", "url": "u", "rev": "r", "dst": "lib/y" },
            { "name": "c", "url": "u", "rev": "r", "dst": "lib/./x" }
        ]));
        assert_eq!(resolver.group_by_destination(&records), vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn test_status_line_tags() {
        colored::control::set_override(false);
        let record = proto().remove(0);
        let mut resolved = ResolvedDependency {
            record,
            dir: PathBuf::from("/opt/vendor/proto"),
            strategy: Strategy::Override,
            sync: None,
            has_export: true,
        };
        assert_eq!(resolved.status_line(), "[override] Proto -> /opt/vendor/proto");

        resolved.strategy = Strategy::GitUpdate;
        resolved.sync = Some(SyncOutcome::UpToDate {
            commit: Some("bbbb2222cccc".to_string()),
        });
        assert_eq!(resolved.status_line(), "[up-to-date] Proto up to date at bbbb2222");
    }
}
