//! Cross-cutting utilities: file system helpers, platform lookups, progress.

pub mod fs;
pub mod platform;
pub mod progress;

pub use fs::{absolutize, atomic_write, ensure_dir, normalize_path};
pub use platform::{ensure_git_available, expand_path, get_git_command};
pub use progress::ProgressBar;
