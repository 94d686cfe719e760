//! Integration test suite for depsync
//!
//! End-to-end tests that run the `depsync` binary against real git
//! repositories created in temporary directories. Tests that need git skip
//! themselves when it is not installed.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **configure**: fresh clones, updates, idempotence, output layout
//! - **overrides**: developer overrides, local references, vendored copies
//! - **errors**: fatal configuration errors and exit codes
//! - **build**: `depsync build` invocation and exit code forwarding

#[path = "../common/mod.rs"]
mod common;

mod build;
mod configure;
mod errors;
mod overrides;

/// Whether git is available; tests that need it return early otherwise.
fn git_available() -> bool {
    depsync::utils::platform::is_git_installed()
}
