//! Engine configuration.
//!
//! [`Settings`] is a plain value handed by reference to the constructors
//! that need it. There is no global configuration state; a host that wants
//! different policies for different resources can simply use two `Settings`
//! values.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tuning knobs for resource resolution and live reload.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Directory tried first when resolving logical paths.
    pub project_root: PathBuf,
    /// Minimum quiet time after a detected change before a file is
    /// considered stable enough to reload.
    pub file_modify_grace_period: Duration,
    /// Number of content versions retained per resource.
    pub file_history_depth: usize,
    /// Suggested sleep between refresh polls. The engine never sleeps on
    /// this itself; it is consumed by the host's polling loop.
    pub refresh_poll_interval: Duration,
    /// Run the external diff tool when an activation fails.
    pub diff_enabled: bool,
    /// Command template for the diff tool. `<oldFile>` and `<newFile>` are
    /// replaced with the paths to compare.
    pub diff_command: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("data/"),
            file_modify_grace_period: Duration::from_millis(25),
            file_history_depth: 8,
            refresh_poll_interval: Duration::from_millis(150),
            diff_enabled: false,
            diff_command: "diff --ignore-all-space --unified '<oldFile>' '<newFile>'"
                .to_string(),
        }
    }
}

impl Settings {
    /// Set the project root, validating that it points at a directory.
    ///
    /// A missing path falls back to the current directory; a path that is
    /// not a directory is rejected. Both cases are logged and leave the
    /// previous root in place only in the rejection case.
    pub fn set_project_root(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();

        if !path.exists() {
            log::debug!(
                "Project path '{}' not existing. Using current directory.",
                path.display()
            );
            self.project_root = PathBuf::new();
            return;
        }

        if !path.is_dir() {
            log::error!("Project path is not a directory: '{}'", path.display());
            return;
        }

        self.project_root = path.to_path_buf();
        log::info!("Project path: {}", self.project_root.display());
    }
}
