//! Developer overrides.
//!
//! `.submodules_local.json` lets a developer point any library at a local
//! working tree:
//!
//! ```json
//! { "overrides": { "proto": "~/src/proto", "MPU9250_LIB": "/opt/vendor/mpu9250" } }
//! ```
//!
//! Keys may be written as the raw library name, its symbolic key, or the
//! mapping key it was declared under. All of these are folded to one form at
//! load time with [`sanitize_key`], so lookups only ever use symbolic keys.

use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::{DepsyncError, sanitize_key};
use crate::declaration::DependencyRecord;
use crate::utils::fs::absolutize;
use crate::utils::platform::expand_path;

/// One override entry after canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    /// Key as written in the override file
    pub raw_key: String,
    /// Absolute directory, after `~`/`$VAR` expansion
    pub path: PathBuf,
}

/// Overrides indexed by symbolic key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideMap {
    entries: BTreeMap<String, OverrideEntry>,
}

impl OverrideMap {
    /// An empty map; used when no override file exists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map from raw `(key, path)` pairs.
    ///
    /// Paths are expanded and made absolute against `root`. Two raw keys that
    /// canonicalize to the same symbolic key are accepted only when they point
    /// at the same directory.
    ///
    /// # Errors
    ///
    /// [`DepsyncError::ConflictingOverride`] on a canonical key collision with
    /// different paths, or an expansion error for unset variables.
    pub fn from_pairs<I, K, P>(pairs: I, root: &Path) -> Result<Self>
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: AsRef<str>,
    {
        let mut entries: BTreeMap<String, OverrideEntry> = BTreeMap::new();

        for (raw_key, raw_path) in pairs {
            let raw_key = raw_key.into();
            let path = absolutize(root, &expand_path(raw_path.as_ref())?);
            let key = sanitize_key(&raw_key);

            if let Some(existing) = entries.get(&key) {
                if existing.path != path {
                    return Err(DepsyncError::ConflictingOverride {
                        key,
                        first: existing.raw_key.clone(),
                        second: raw_key,
                    }
                    .into());
                }
                continue;
            }
            entries.insert(
                key,
                OverrideEntry {
                    raw_key,
                    path,
                },
            );
        }

        Ok(Self {
            entries,
        })
    }

    /// Parse the `overrides` field of an override document.
    ///
    /// A document without `overrides` yields an empty map.
    ///
    /// # Errors
    ///
    /// [`DepsyncError::OverrideParse`] when `overrides` is not an object of
    /// strings, plus the errors of [`OverrideMap::from_pairs`].
    pub fn from_document(document: &Value, file: &Path, root: &Path) -> Result<Self> {
        let parse_error = |reason: String| DepsyncError::OverrideParse {
            file: file.display().to_string(),
            reason,
        };

        let Some(overrides) = document.get("overrides") else {
            return Ok(Self::new());
        };
        let Value::Object(map) = overrides else {
            return Err(parse_error("'overrides' must be an object".to_string()).into());
        };

        let mut pairs = Vec::with_capacity(map.len());
        for (key, value) in map {
            let Value::String(path) = value else {
                return Err(parse_error(format!("override '{key}' must be a path string")).into());
            };
            pairs.push((key.clone(), path.clone()));
        }
        Self::from_pairs(pairs, root)
    }

    /// Find the override for a record.
    ///
    /// The record's symbolic key is tried first, then the canonical form of
    /// the mapping key it was declared under, if that differs.
    #[must_use]
    pub fn lookup(&self, record: &DependencyRecord) -> Option<&OverrideEntry> {
        self.entries
            .get(&record.key)
            .or_else(|| record.alias.as_deref().and_then(|alias| self.entries.get(&sanitize_key(alias))))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no overrides are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw keys as written by the developer, in canonical-key order.
    pub fn raw_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|entry| entry.raw_key.as_str())
    }
}
