//! File system helpers used by the loader, resolver, and emitter.
//!
//! The generated make fragment must never be observed half-written, so every
//! write goes through [`atomic_write`]: content lands in a temporary file in
//! the destination directory and is renamed over the target.

use anyhow::{Context, Result};

use crate::core::DepsyncError;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Creates a directory and all of its parents if they don't exist.
///
/// # Errors
///
/// Fails when the directory cannot be created or the path exists but is not a
/// directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(DepsyncError::Io {
            message: format!("Path exists but is not a directory: {}", path.display()),
        }
        .into());
    }
    Ok(())
}

/// Atomically replaces `path` with `content`.
///
/// The temporary file is created next to the target so the final rename
/// never crosses a filesystem boundary. Parent directories are created as
/// needed. On failure the previous content of `path` is left untouched.
///
/// # Examples
///
/// ```rust,no_run
/// use depsync::utils::fs::atomic_write;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// atomic_write(Path::new("generated/third_party.mk"), b"FOO_DIR := /opt/foo\n")?;
/// # Ok(())
/// # }
/// ```
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_dir(&parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(&parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;
    temp.write_all(content)
        .with_context(|| format!("Failed to write temp file for: {}", path.display()))?;
    temp.as_file().sync_all().context("Failed to sync file to disk")?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Lexically normalizes a path, dropping `.` and folding `..` components.
///
/// Symlinks are not resolved, so the result matches what the user wrote.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else if !matches!(components.last(), Some(Component::RootDir)) {
                    components.push(component);
                }
            }
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Makes `path` absolute against `base` (when relative) and normalizes it.
#[must_use]
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    }
}

/// Reads a file, returning `None` when it does not exist.
///
/// # Errors
///
/// Any I/O error other than "not found" is returned with the path attached.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read: {}", path.display())),
    }
}
