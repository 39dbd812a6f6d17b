// output.rs - Console output and warning sink
// Purpose: Shared, append-only sink for warnings emitted by concurrent probes

use colored::*;
use indicatif::{MultiProgress, ProgressBar};
use std::sync::Mutex;

/// Destination for warnings and status lines produced by the scan engine.
pub trait Output: Send + Sync {
    /// Emit a warning immediately. Implementations must not interleave concurrent messages.
    fn warn(&self, message: &str);

    fn info(&self, _message: &str) {}

    /// Register a visible progress bar so messages are printed around it.
    fn track(&self, bar: ProgressBar) -> ProgressBar {
        bar
    }
}

/// Colored stdout/stderr output
pub struct StandardOutput {
    quiet: bool,
    lock: Mutex<()>,
    bars: MultiProgress,
}

impl StandardOutput {
    pub fn new() -> Self {
        Self {
            quiet: false,
            lock: Mutex::new(()),
            bars: MultiProgress::new(),
        }
    }

    /// Suppress info lines (used with --json so stdout stays machine readable)
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::new()
        }
    }
}

impl Default for StandardOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for StandardOutput {
    fn warn(&self, message: &str) {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Active bars are cleared while the line is written, then redrawn.
        self.bars
            .suspend(|| eprintln!("{}", format!("[!] {}", message).yellow()));
    }

    fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.bars
            .suspend(|| println!("{}", format!("[*] {}", message).cyan()));
    }

    fn track(&self, bar: ProgressBar) -> ProgressBar {
        self.bars.add(bar)
    }
}

/// Collects warnings and info lines in memory; used by tests to count calls.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingOutput {
    warnings: Mutex<Vec<String>>,
    infos: Mutex<Vec<String>>,
    tracked: Mutex<usize>,
}

#[cfg(test)]
impl RecordingOutput {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().map(|i| i.clone()).unwrap_or_default()
    }

    pub fn tracked(&self) -> usize {
        self.tracked.lock().map(|t| *t).unwrap_or_default()
    }
}

#[cfg(test)]
impl Output for RecordingOutput {
    fn warn(&self, message: &str) {
        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(message.to_string());
        }
    }

    fn info(&self, message: &str) {
        if let Ok(mut infos) = self.infos.lock() {
            infos.push(message.to_string());
        }
    }

    fn track(&self, bar: ProgressBar) -> ProgressBar {
        if let Ok(mut tracked) = self.tracked.lock() {
            *tracked += 1;
        }
        bar
    }
}
