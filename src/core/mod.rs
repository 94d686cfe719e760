//! Core types shared by every stage of a run.
//!
//! - [`error`] - the [`DepsyncError`] taxonomy and user-facing [`ErrorContext`]
//! - [`key`] - symbolic key sanitization used for make variables and override lookup

pub mod error;
pub mod key;

pub use error::{DepsyncError, ErrorContext, user_friendly_error};
pub use key::sanitize_key;
