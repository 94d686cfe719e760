//! Platform helpers: locating executables and expanding user paths.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::core::DepsyncError;

/// Name of the git executable for the current platform.
#[must_use]
pub const fn get_git_command() -> &'static str {
    if cfg!(windows) {
        "git.exe"
    } else {
        "git"
    }
}

/// Returns `true` when git can be found on PATH.
#[must_use]
pub fn is_git_installed() -> bool {
    which::which(get_git_command()).is_ok()
}

/// Fails with [`DepsyncError::GitNotFound`] when git is not on PATH.
///
/// # Errors
///
/// Returns [`DepsyncError::GitNotFound`] when the lookup fails.
pub fn ensure_git_available() -> Result<()> {
    if is_git_installed() {
        Ok(())
    } else {
        Err(DepsyncError::GitNotFound.into())
    }
}

/// Expands `~` and `$VAR` / `${VAR}` in a user-supplied path.
///
/// # Errors
///
/// Fails when a referenced environment variable is not set or the home
/// directory cannot be determined.
///
/// # Examples
///
/// ```rust,no_run
/// use depsync::utils::platform::expand_path;
///
/// # fn example() -> anyhow::Result<()> {
/// let proto = expand_path("~/src/proto")?;
/// let vendor = expand_path("$VENDOR_ROOT/proto")?;
/// # Ok(())
/// # }
/// ```
pub fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded =
        shellexpand::full(path).with_context(|| format!("Failed to expand path: {path}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_plain() {
        assert_eq!(expand_path("/opt/vendor/proto").unwrap(), PathBuf::from("/opt/vendor/proto"));
    }

    #[test]
    fn test_expand_path_undefined_variable_fails() {
        assert!(expand_path("$DEPSYNC_SURELY_UNSET_VARIABLE/x").is_err());
    }

    #[test]
    fn test_git_command_name() {
        let name = get_git_command();
        assert!(name.starts_with("git"));
    }
}
