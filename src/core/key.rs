//! Symbolic key derivation.

/// Turn a library name into its symbolic key.
///
/// The name is uppercased and every character outside `[A-Z0-9_]` becomes
/// `_`. The result is used both as the make variable prefix (`<KEY>_DIR`) and
/// as the canonical override lookup key.
///
/// # Examples
///
/// ```rust
/// use depsync::core::sanitize_key;
///
/// assert_eq!(sanitize_key("inner-proto"), "INNER_PROTO");
/// assert_eq!(sanitize_key("Foo Bar"), "FOO_BAR");
/// ```
#[must_use]
pub fn sanitize_key(name: &str) -> String {
    name.to_uppercase()
        .chars()
        .map(|c| if c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' { c } else { '_' })
        .collect()
}
