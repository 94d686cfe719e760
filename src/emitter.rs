//! Generated makefile fragment.
//!
//! The fragment is a pure function of the resolved libraries: one
//! `<KEY>_DIR` binding plus an optional include of the library's exported
//! metadata per library, in declared order, then a fixed aggregation block
//! that folds well-known libraries into `C_INCLUDES` and `C_SOURCES`.
//!
//! ```make
//! # Auto-generated by depsync configure; do not edit
//!
//! PROTO_DIR := /work/fw/lib/proto
//! -include $(PROTO_DIR)/export.mk
//! ```
//!
//! The file is rendered in memory and replaced atomically, so a failed run
//! never leaves a half-written fragment behind.

use anyhow::Result;
use std::fmt::Write as _;

use crate::config::Settings;
use crate::resolver::ResolvedDependency;
use crate::utils::fs::atomic_write;

/// First line of every generated file.
pub const HEADER: &str = "# Auto-generated by depsync configure; do not edit";

/// Render the full fragment.
#[must_use]
pub fn render(resolved: &[ResolvedDependency], settings: &Settings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{HEADER}");
    out.push('\n');

    for dep in resolved {
        let var = format!("{}_DIR", dep.record.key);
        let _ = writeln!(out, "{var} := {}", dep.dir.display());
        let _ = writeln!(out, "-include $({var})/{}", settings.export_file);
        out.push('\n');
    }

    render_aggregation(&mut out, &settings.aggregate_keys);
    out
}

fn render_aggregation(out: &mut String, keys: &[String]) {
    let _ = writeln!(out, "# Aggregate sources of well-known libraries");
    for key in keys {
        let dir = format!("$({key}_DIR)");
        let _ = writeln!(out, "ifneq ($(strip {dir}),)");
        let _ = writeln!(out, "C_INCLUDES += -I{dir}/Inc");
        let _ = writeln!(
            out,
            "C_SOURCES += $(wildcard {dir}/Src/*.c) $(wildcard {dir}/Src/*.s) $(wildcard {dir}/Src/*.S)"
        );
        let _ = writeln!(out, "endif");
    }
    out.push('\n');
    let _ = writeln!(out, "C_INCLUDES := $(sort $(C_INCLUDES))");
    let _ = writeln!(out, "C_SOURCES := $(sort $(C_SOURCES))");
    let _ = writeln!(out, "$(info [AGG] C_INCLUDES = $(C_INCLUDES))");
    let _ = writeln!(out, "$(info [AGG] C_SOURCES = $(C_SOURCES))");
}

/// Render and atomically write the fragment to `settings.output_path`.
///
/// # Errors
///
/// Returns an error if the output directory cannot be created or the file
/// cannot be replaced.
pub fn emit(resolved: &[ResolvedDependency], settings: &Settings) -> Result<()> {
    let content = render(resolved, settings);
    atomic_write(&settings.output_path, content.as_bytes())?;
    tracing::debug!(
        "Wrote {} bindings to {}",
        resolved.len(),
        settings.output_path.display()
    );
    Ok(())
}
