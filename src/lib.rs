//! depsync - third-party library resolver for firmware builds
//!
//! A firmware project declares its external libraries in
//! `submodules_list.json` (name, git url, revision, destination). depsync
//! turns every declaration into a local directory and writes
//! `generated/third_party.mk`, a makefile fragment binding `<KEY>_DIR` for
//! each library, which the firmware makefile includes.
//!
//! # Pipeline
//!
//! ```text
//! loader ─► declaration::normalize ─► resolver ⇄ git::sync ─► emitter
//! ```
//!
//! - [`loader`] reads the lock file and the optional developer overrides
//! - [`declaration`] normalizes list- or mapping-shaped `libs` into ordered
//!   [`declaration::DependencyRecord`]s with unique symbolic keys
//! - [`resolver`] picks, per library, the first applicable strategy:
//!   override, local path, update of an existing checkout, vendored copy,
//!   or fresh clone
//! - [`git`] brings checkouts to the declared branch, tag, or commit through
//!   the system `git` binary
//! - [`emitter`] renders the fragment and replaces it atomically
//!
//! # Lock File
//!
//! ```json
//! {
//!   "libs": [
//!     { "name": "Proto", "url": "https://example/proto.git", "rev": "v2.0", "dst": "lib/proto" },
//!     { "name": "mpu9250-lib", "url": "local:../drivers/mpu9250", "rev": "main", "dst": "lib/mpu" }
//!   ]
//! }
//! ```
//!
//! # Developer Overrides
//!
//! `.submodules_local.json` is meant to stay out of version control:
//!
//! ```json
//! { "overrides": { "PROTO": "~/src/proto" } }
//! ```
//!
//! # Supporting Modules
//!
//! - [`cli`] - `configure` and `build` commands
//! - [`config`] - defaults, `depsync.toml`, environment, and flags merged into
//!   [`config::Settings`]
//! - [`core`] - error taxonomy and key sanitization
//! - [`overrides`] - canonicalized override lookup
//! - [`utils`] - atomic writes, path helpers, progress bar

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod declaration;
pub mod emitter;
pub mod git;
pub mod loader;
pub mod overrides;
pub mod resolver;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
