//! Library declarations and their normalization.
//!
//! The lock document's `libs` field comes in two equivalent shapes:
//!
//! ```json
//! { "libs": [ { "name": "Proto", "url": "https://example/proto.git", "rev": "v2.0", "dst": "lib/proto" } ] }
//! ```
//!
//! ```json
//! { "libs": { "Proto": { "url": "https://example/proto.git", "rev": "v2.0", "dst": "lib/proto" } } }
//! ```
//!
//! [`normalize`] turns either into the same ordered list of
//! [`DependencyRecord`]s. Order follows the document, which in turn fixes the
//! order of the generated make fragment.

use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

use crate::core::{DepsyncError, sanitize_key};

const REQUIRED_FIELDS: [&str; 3] = ["url", "rev", "dst"];

/// The `libs` field of a lock document, before validation of its entries.
#[derive(Debug, Clone, PartialEq)]
pub enum RawDeclarations {
    /// `libs` as an array; each entry carries its own `name`
    List(Vec<Value>),
    /// `libs` as an object; the key supplies `name` when the entry has none
    Mapping(Map<String, Value>),
}

impl RawDeclarations {
    /// Check the shape of `libs` taken from the lock document at `file`.
    ///
    /// # Errors
    ///
    /// [`DepsyncError::InvalidLibs`] when `libs` is absent, empty, or neither an
    /// array nor an object.
    pub fn from_libs(libs: Option<Value>, file: &Path) -> Result<Self> {
        let invalid = || DepsyncError::InvalidLibs {
            file: file.display().to_string(),
        };
        match libs {
            Some(Value::Array(items)) if !items.is_empty() => Ok(Self::List(items)),
            Some(Value::Object(map)) if !map.is_empty() => Ok(Self::Mapping(map)),
            _ => Err(invalid().into()),
        }
    }

    /// Number of declared entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::List(items) => items.len(),
            Self::Mapping(map) => map.len(),
        }
    }

    /// Whether no entries are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One declared external library.
///
/// Immutable once normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
    /// Display name
    pub name: String,
    /// Symbolic key: the sanitized, uppercased name
    pub key: String,
    /// Remote git URL or local reference (`local:`, `path:`, `file://`, `/...`)
    pub url: String,
    /// Branch, tag, or commit id
    pub rev: String,
    /// Destination path relative to the project root
    pub dst: String,
    /// Mapping key the entry was declared under, when it differs from `name`
    pub alias: Option<String>,
    /// Any other fields, kept verbatim
    pub extra: Map<String, Value>,
}

/// Normalize raw declarations into ordered records.
///
/// # Errors
///
/// - [`DepsyncError::InvalidDeclaration`] for an entry that is not an object
/// - [`DepsyncError::MissingField`] when `name` (list form), `url`, `rev`, or
///   `dst` is absent or empty
/// - [`DepsyncError::InvalidField`] when one of those is not a string or number
/// - [`DepsyncError::DuplicateKey`] when two names sanitize to the same key
pub fn normalize(raw: &RawDeclarations) -> Result<Vec<DependencyRecord>> {
    let mut records = Vec::with_capacity(raw.len());

    match raw {
        RawDeclarations::List(items) => {
            for (index, item) in items.iter().enumerate() {
                let position = format!("#{}", index + 1);
                let Value::Object(fields) = item else {
                    return Err(DepsyncError::InvalidDeclaration {
                        entry: position,
                    }
                    .into());
                };
                let name = required_text(fields, "name", &position)?;
                records.push(build_record(name, None, fields)?);
            }
        }
        RawDeclarations::Mapping(map) => {
            for (declared_key, item) in map {
                let Value::Object(fields) = item else {
                    return Err(DepsyncError::InvalidDeclaration {
                        entry: format!("'{declared_key}'"),
                    }
                    .into());
                };
                let name = if fields.contains_key("name") {
                    required_text(fields, "name", declared_key)?
                } else {
                    declared_key.clone()
                };
                let alias = (*declared_key != name).then(|| declared_key.clone());
                records.push(build_record(name, alias, fields)?);
            }
        }
    }

    reject_duplicate_keys(&records)?;
    Ok(records)
}

fn build_record(
    name: String,
    alias: Option<String>,
    fields: &Map<String, Value>,
) -> Result<DependencyRecord> {
    let [url, rev, dst] = REQUIRED_FIELDS;
    let url = required_text(fields, url, &name)?;
    let rev = required_text(fields, rev, &name)?;
    let dst = required_text(fields, dst, &name)?;

    let extra = fields
        .iter()
        .filter(|(field, _)| *field != "name" && !REQUIRED_FIELDS.contains(&field.as_str()))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect();

    Ok(DependencyRecord {
        key: sanitize_key(&name),
        name,
        url,
        rev,
        dst,
        alias,
        extra,
    })
}

/// Read a required textual field; numbers are accepted and stringified.
fn required_text(fields: &Map<String, Value>, field: &str, record: &str) -> Result<String> {
    let missing = || DepsyncError::MissingField {
        record: record.to_string(),
        field: field.to_string(),
    };
    match fields.get(field) {
        None | Some(Value::Null) => Err(missing().into()),
        Some(Value::String(s)) if s.is_empty() => Err(missing().into()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(DepsyncError::InvalidField {
            record: record.to_string(),
            field: field.to_string(),
        }
        .into()),
    }
}

fn reject_duplicate_keys(records: &[DependencyRecord]) -> Result<()> {
    let mut seen: HashMap<&str, &str> = HashMap::with_capacity(records.len());
    for record in records {
        if let Some(first) = seen.insert(&record.key, &record.name) {
            return Err(DepsyncError::DuplicateKey {
                key: record.key.clone(),
                first: first.to_string(),
                second: record.name.clone(),
            }
            .into());
        }
    }
    Ok(())
}
