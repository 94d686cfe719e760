//! Error handling for depsync
//!
//! Every fatal condition of a run is a [`DepsyncError`] variant. Module
//! boundaries pass [`anyhow::Error`] so call sites can add context with
//! `.context(...)`, and the CLI turns whatever reaches `main` into an
//! [`ErrorContext`] through [`user_friendly_error`].
//!
//! # Error Categories
//!
//! - **Configuration errors**: unreadable or malformed lock/override/config
//!   documents, missing or invalid fields, duplicate symbolic keys, broken
//!   override or local paths. Always fatal, never retried.
//! - **Git errors**: a failed clone is fatal; failures while refreshing an
//!   existing checkout are downgraded to warnings by the synchronizer and never
//!   reach this layer.
//! - **Process errors**: interruption and downstream build failures, which map
//!   to dedicated exit codes.
//!
//! # Display
//!
//! ```rust,no_run
//! use depsync::core::{DepsyncError, user_friendly_error};
//!
//! let error = anyhow::Error::from(DepsyncError::LockNotFound {
//!     path: "submodules_list.json".to_string(),
//! });
//! user_friendly_error(error).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::constants::EXIT_INTERRUPTED;

/// The main error type for depsync operations.
///
/// All fields are plain strings so the error can be cloned out of an
/// [`anyhow::Error`] when building a user-facing diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DepsyncError {
    /// The lock document does not exist.
    ///
    /// The declared library set is mandatory input.
    #[error("Lock file not found: {path}")]
    LockNotFound {
        /// Path that was probed
        path: String,
    },

    /// The lock document is not valid JSON.
    #[error("Invalid lock file syntax in {file} at line {line}, column {column}")]
    LockParse {
        /// Lock file path
        file: String,
        /// 1-based line of the parse error
        line: usize,
        /// 1-based column of the parse error
        column: usize,
        /// Parser message
        reason: String,
    },

    /// The override document exists but is not valid JSON or has the wrong shape.
    #[error("Invalid override file {file}: {reason}")]
    OverrideParse {
        /// Override file path
        file: String,
        /// Parser message
        reason: String,
    },

    /// The optional project configuration exists but cannot be parsed.
    #[error("Invalid project configuration {file}: {reason}")]
    ConfigParse {
        /// Configuration file path
        file: String,
        /// Parser message
        reason: String,
    },

    /// `libs` is absent, empty, or neither an array nor an object.
    #[error("{file}: expected a non-empty 'libs' array or object")]
    InvalidLibs {
        /// Lock file path
        file: String,
    },

    /// An entry of `libs` is not an object.
    #[error("Library declaration {entry} is not an object")]
    InvalidDeclaration {
        /// Position (list form) or mapping key of the entry
        entry: String,
    },

    /// A required field is absent or empty.
    #[error("Library '{record}' is missing required field '{field}'")]
    MissingField {
        /// Name of the record, or its position when the name is missing
        record: String,
        /// The missing field
        field: String,
    },

    /// A required field has a type that cannot be read as text.
    #[error("Library '{record}' has an invalid '{field}' field: expected a string")]
    InvalidField {
        /// Name of the record
        record: String,
        /// The offending field
        field: String,
    },

    /// Two declarations sanitize to the same symbolic key.
    #[error("Duplicate library key after sanitization: {key} ('{first}' and '{second}')")]
    DuplicateKey {
        /// The colliding symbolic key
        key: String,
        /// Name of the first declaration
        first: String,
        /// Name of the second declaration
        second: String,
    },

    /// Two override entries canonicalize to the same key with different paths.
    #[error("Overrides '{first}' and '{second}' both map to key {key} with different paths")]
    ConflictingOverride {
        /// The canonical key
        key: String,
        /// First raw override key
        first: String,
        /// Second raw override key
        second: String,
    },

    /// An override matched but its directory does not exist.
    #[error("[override] {name}: directory not found: {path}")]
    OverrideNotFound {
        /// Library name
        name: String,
        /// Resolved override directory
        path: String,
    },

    /// A local-reference URL points at a missing directory.
    #[error("[local-url] {name}: path not found: {path}")]
    LocalPathNotFound {
        /// Library name
        name: String,
        /// Resolved local directory
        path: String,
    },

    /// Git executable not found in PATH.
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// A git command returned a non-zero exit code or timed out.
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed (e.g., "fetch", "rev-parse")
        operation: String,
        /// The error output from the git command
        stderr: String,
    },

    /// Cloning a library failed.
    #[error("Failed to clone repository: {url}")]
    GitCloneFailed {
        /// The repository URL that failed to clone
        url: String,
        /// Git's explanation
        reason: String,
    },

    /// Checking out a revision failed.
    #[error("Failed to checkout reference '{reference}'")]
    GitCheckoutFailed {
        /// The reference that failed to check out
        reference: String,
        /// Git's explanation
        reason: String,
    },

    /// The build tool could not be started.
    #[error("Failed to run build tool '{program}'")]
    BuildSpawnFailed {
        /// Program that was invoked
        program: String,
        /// OS error text
        reason: String,
    },

    /// A file system operation failed.
    #[error("{message}")]
    Io {
        /// Operation, path, and OS error text
        message: String,
    },

    /// The run was interrupted before completion.
    #[error("Interrupted by user")]
    Interrupted,

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl DepsyncError {
    /// Process exit status associated with this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Interrupted => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// Pairs a [`DepsyncError`] with optional details and a suggestion, rendered in
/// red, yellow, and green respectively by [`ErrorContext::display`].
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: DepsyncError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no details or suggestion.
    #[must_use]
    pub const fn new(error: DepsyncError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Exit status for the wrapped error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }

    /// Print the error, details, and suggestion to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`].
///
/// Recognizes [`DepsyncError`] anywhere in the chain (context layers are
/// preserved as details), then [`std::io::Error`], and falls back to the full
/// error chain for anything else.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(depsync_error) = error.downcast_ref::<DepsyncError>() {
        let ctx = create_error_context(depsync_error.clone());
        // Context layers added on top of the typed error, outermost first
        let layers: Vec<String> = error
            .chain()
            .take_while(|cause| cause.downcast_ref::<DepsyncError>().is_none())
            .map(ToString::to_string)
            .collect();
        if layers.is_empty() || ctx.details.is_some() {
            return ctx;
        }
        return ctx.with_details(layers.join(": "));
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        let ctx = ErrorContext::new(DepsyncError::Io {
            message: format!("{error:#}"),
        });
        return match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                ctx.with_suggestion("Check file ownership and permissions of the project directory")
            }
            std::io::ErrorKind::NotFound => {
                ctx.with_suggestion("Check that the file or directory exists and the path is correct")
            }
            _ => ctx,
        };
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(DepsyncError::Other {
        message,
    })
}

/// Attach tailored details and suggestions to each error variant.
fn create_error_context(error: DepsyncError) -> ErrorContext {
    match &error {
        DepsyncError::LockNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Run from the project root or pass --lock / --root")
            .with_details("The lock file declares every third-party library and is required"),
        DepsyncError::LockParse {
            reason, ..
        } => {
            let reason = reason.clone();
            ErrorContext::new(error)
                .with_details(reason)
                .with_suggestion("Check for trailing commas, unquoted keys, or unbalanced braces")
        }
        DepsyncError::OverrideParse {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "The override file must look like {\"overrides\": {\"NAME\": \"/abs/path\"}}; delete it to disable overrides",
        ),
        DepsyncError::ConfigParse {
            ..
        } => ErrorContext::new(error).with_suggestion("Check the TOML syntax of depsync.toml"),
        DepsyncError::MissingField {
            ..
        }
        | DepsyncError::InvalidField {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Every library needs non-empty 'name', 'url', 'rev' and 'dst' strings"),
        DepsyncError::DuplicateKey {
            ..
        } => ErrorContext::new(error)
            .with_details("Library names are uppercased and non [A-Z0-9_] characters become '_'")
            .with_suggestion("Rename one of the libraries so their make variables differ"),
        DepsyncError::OverrideNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Fix or remove the entry in .submodules_local.json"),
        DepsyncError::LocalPathNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Point the library url at an existing directory"),
        DepsyncError::GitNotFound => ErrorContext::new(error)
            .with_suggestion("Install git from https://git-scm.com/ and make sure it is on PATH"),
        DepsyncError::GitCloneFailed {
            reason, ..
        }
        | DepsyncError::GitCheckoutFailed {
            reason, ..
        }
        | DepsyncError::GitCommandError {
            stderr: reason, ..
        } => {
            let reason = reason.trim().to_string();
            let ctx = ErrorContext::new(error)
                .with_suggestion("Check network access, credentials, and that the revision exists");
            if reason.is_empty() {
                ctx
            } else {
                ctx.with_details(reason)
            }
        }
        DepsyncError::BuildSpawnFailed {
            reason, ..
        } => {
            let reason = reason.clone();
            ErrorContext::new(error)
                .with_details(reason)
                .with_suggestion("Install make or pass --make with the build tool to use")
        }
        _ => ErrorContext::new(error),
    }
}
