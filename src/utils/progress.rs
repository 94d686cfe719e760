//! Progress reporting for the resolution phase.
//!
//! A thin wrapper over [`indicatif`] that stays hidden when progress is
//! disabled (`--no-progress`, `--quiet`) or stderr is not a terminal. Status
//! lines must go through [`ProgressBar::println`] so they never tear the bar.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::io::IsTerminal;

/// Progress bar tracking resolved libraries.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a bar over `len` units, or a hidden one when `enabled` is false
    /// or stderr is not a terminal.
    pub fn new(len: u64, enabled: bool) -> Self {
        let bar = if enabled && std::io::stderr().is_terminal() {
            let bar = IndicatifBar::new(len);
            bar.set_style(default_style());
            bar
        } else {
            IndicatifBar::hidden()
        };
        Self {
            inner: bar,
        }
    }

    /// A bar that never draws; used by library callers and tests.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Sets the prefix shown before the bar.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    /// Sets the trailing message.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Advances the bar.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Prints a line to stdout without corrupting the bar.
    pub fn println(&self, line: impl AsRef<str>) {
        let line = line.as_ref();
        self.inner.suspend(|| println!("{line}"));
    }

    /// Removes the bar from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn default_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map_or_else(|_| IndicatifStyle::default_bar(), |style| style.progress_chars("━╸━"))
}
