//! Test utilities for depsync
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration tests:
//! - [`MockVcs`] simulates remotes so resolver logic runs without git
//! - [`TestGit`] builds real repositories for end-to-end tests
//! - [`init_test_logging`] routes `tracing` output to the test harness
//!
//! # Example
//!
//! ```rust,no_run
//! use depsync::test_utils::MockVcs;
//!
//! let vcs = MockVcs::new();
//! vcs.add_remote("https://example/proto.git").tag("v2.0", "bbbb2222").with_export(true);
//! assert_eq!(vcs.network_calls(), 0);
//! ```

pub mod git_helper;
pub mod mock_vcs;

pub use git_helper::TestGit;
pub use mock_vcs::{MockVcs, RemoteBuilder};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Initializes the tracing subscriber once per process. `level` wins when
/// given; otherwise `RUST_LOG` is used, and with neither nothing is logged.
///
/// ```bash
/// RUST_LOG=git=debug,sync=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer() // Important: uses test-compatible writer
            .with_target(true) // Show targets like "git" and "sync"
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
