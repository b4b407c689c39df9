//! Poll-driven refresh coordination.
//!
//! The [`RefreshManager`] owns the reloadable scripts of a running
//! session and sweeps them on demand. It introduces no thread of its own:
//! the host decides when a sweep happens (typically once per coarse
//! polling tick) and how long to sleep between ticks.

use std::time::Instant;

use crate::script::{LoadOutcome, Script};

/// Summary of one refresh sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Scripts that activated fresh content.
    pub reloaded: usize,
    /// Scripts whose new content failed and were rolled back.
    pub rolled_back: usize,
    /// Scripts whose reload attempt failed hard.
    pub failed: usize,
}

impl RefreshReport {
    /// Whether the sweep changed anything at all.
    pub fn any_activity(&self) -> bool {
        self.reloaded + self.rolled_back + self.failed > 0
    }
}

/// Registry of reloadable scripts.
#[derive(Default)]
pub struct RefreshManager {
    scripts: Vec<Script>,
}

impl RefreshManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script to the sweep. Returns its index for later access.
    pub fn register(&mut self, script: Script) -> usize {
        log::debug!(
            "Watching file: {}",
            script.resource().resolved_path().display()
        );
        self.scripts.push(script);
        self.scripts.len() - 1
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Script> {
        self.scripts.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Sweep all scripts once, reloading those whose backing file changed
    /// and settled. Hard failures are logged and counted, never
    /// propagated; the previously active versions keep running.
    pub fn poll(&mut self) -> RefreshReport {
        self.sweep(false)
    }

    /// Reload every script regardless of modification state. Immutable
    /// scripts still load at most once.
    pub fn force_reload(&mut self) -> RefreshReport {
        log::info!("Reloading {} file(s)", self.scripts.len());
        self.sweep(true)
    }

    fn sweep(&mut self, force: bool) -> RefreshReport {
        let start = Instant::now();
        let mut report = RefreshReport::default();

        for script in &mut self.scripts {
            let outcome = if force { script.force_load() } else { script.load() };
            match outcome {
                Ok(LoadOutcome::Unchanged) => {}
                Ok(LoadOutcome::Loaded) => report.reloaded += 1,
                Ok(LoadOutcome::RolledBack) => report.rolled_back += 1,
                Err(e) => {
                    log::error!(
                        "Reload failed. file:'{}': {}",
                        script.resource().resolved_path().display(),
                        e
                    );
                    report.failed += 1;
                }
            }
        }

        if report.any_activity() {
            log::debug!(
                "Refreshed {} file(s) in {} ms",
                report.reloaded + report.rolled_back,
                start.elapsed().as_millis()
            );
        }

        report
    }
}
