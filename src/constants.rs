//! Global constants used throughout the depsync codebase.
//!
//! File names, timeouts, parallelism defaults, and exit codes live here so the
//! values that shape a run are discoverable in one place.

use std::time::Duration;

/// Default lock file holding the declared libraries, relative to the project root.
pub const DEFAULT_LOCK_FILE: &str = "submodules_list.json";

/// Default developer override file, relative to the project root.
pub const DEFAULT_OVERRIDE_FILE: &str = ".submodules_local.json";

/// Default generated make fragment, relative to the project root.
pub const DEFAULT_OUTPUT_FILE: &str = "generated/third_party.mk";

/// Optional project configuration file, relative to the project root.
pub const PROJECT_CONFIG_FILE: &str = "depsync.toml";

/// Per-library build metadata file included by the generated fragment.
pub const DEFAULT_EXPORT_FILE: &str = "export.mk";

/// Timeout for network-bound git operations (clone and fetch).
///
/// Network calls are the only unbounded-latency step of a run.
pub const GIT_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for local git operations (rev-parse, checkout, reset).
pub const GIT_LOCAL_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on the default number of concurrent resolutions.
///
/// Keeps the default polite towards git hosts even on large machines.
pub const MAX_DEFAULT_PARALLELISM: usize = 8;

/// Multiplier applied to CPU core count for default parallelism.
pub const PARALLELISM_CORE_MULTIPLIER: usize = 2;

/// Default CPU core count when detection fails.
pub const FALLBACK_CORE_COUNT: usize = 4;

/// Variable prefixes that the aggregation block knows how to fold into
/// `C_INCLUDES` / `C_SOURCES`.
pub const DEFAULT_AGGREGATE_KEYS: &[&str] = &["INNER_PROTO", "MPU9250_LIB", "QMC5883_LIB"];

/// Default makefile driven by `depsync build`.
pub const DEFAULT_MAKEFILE: &str = "STM32Make.make";

/// Default job count passed to make.
pub const DEFAULT_BUILD_JOBS: usize = 16;

/// Default make target.
pub const DEFAULT_BUILD_TARGET: &str = "all";

/// Default build program.
pub const DEFAULT_MAKE: &str = "make";

/// Exit status used when the run is interrupted (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

/// Default parallelism: twice the core count, capped.
#[must_use]
pub fn default_max_parallel() -> usize {
    let cores = std::thread::available_parallelism().map_or(FALLBACK_CORE_COUNT, |n| n.get());
    (cores * PARALLELISM_CORE_MULTIPLIER).clamp(1, MAX_DEFAULT_PARALLELISM)
}
