//! Declaration loading.
//!
//! Reads the mandatory lock document and the optional override document. No
//! network access happens here.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

use crate::config::Settings;
use crate::core::DepsyncError;
use crate::declaration::RawDeclarations;
use crate::overrides::OverrideMap;
use crate::utils::fs::read_optional;

/// Load both inputs of a run.
///
/// # Errors
///
/// Any error of [`load_lock`] or [`load_overrides`].
pub async fn load(settings: &Settings) -> Result<(RawDeclarations, OverrideMap)> {
    let declarations = load_lock(&settings.lock_path).await?;
    let overrides = load_overrides(&settings.override_path, &settings.root).await?;
    Ok((declarations, overrides))
}

/// Read the `libs` field of the lock document.
///
/// # Errors
///
/// - [`DepsyncError::LockNotFound`] when the file does not exist
/// - [`DepsyncError::LockParse`] with line and column for malformed JSON
/// - [`DepsyncError::InvalidLibs`] when `libs` is missing, empty, or mis-shaped
pub async fn load_lock(path: &Path) -> Result<RawDeclarations> {
    let content = read_file(path).await?.ok_or_else(|| DepsyncError::LockNotFound {
        path: path.display().to_string(),
    })?;

    let mut document: Value = serde_json::from_str(&content).map_err(|e| DepsyncError::LockParse {
        file: path.display().to_string(),
        line: e.line(),
        column: e.column(),
        reason: e.to_string(),
    })?;

    let libs = match &mut document {
        Value::Object(map) => map.remove("libs"),
        _ => None,
    };
    RawDeclarations::from_libs(libs, path)
}

/// Read the override document; a missing file yields an empty map.
///
/// Relative override paths are resolved against `root`.
///
/// # Errors
///
/// [`DepsyncError::OverrideParse`] for malformed JSON or a mis-shaped
/// `overrides` field, [`DepsyncError::ConflictingOverride`] for keys that
/// collide after canonicalization.
pub async fn load_overrides(path: &Path, root: &Path) -> Result<OverrideMap> {
    let Some(content) = read_file(path).await? else {
        tracing::debug!("No override file at {}", path.display());
        return Ok(OverrideMap::new());
    };

    let document: Value = serde_json::from_str(&content).map_err(|e| DepsyncError::OverrideParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })?;
    if !document.is_object() {
        return Err(DepsyncError::OverrideParse {
            file: path.display().to_string(),
            reason: "expected a JSON object".to_string(),
        }
        .into());
    }

    OverrideMap::from_document(&document, path, root)
}

async fn read_file(path: &Path) -> Result<Option<String>> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_optional(&owned))
        .await
        .with_context(|| format!("Reading {} was cancelled", path.display()))?
}
