//! Resource handles.
//!
//! A [`Resource`] is the resolved reference to a logical path. Resolution
//! tries the project directory first, then the literal path, then the
//! embedded asset store, so the same consumer code works against a live
//! project tree and against a packaged binary.
//!
//! Handles track how the backing file changes over time: the last observed
//! size, when that size last changed, and when the current content was
//! accepted. [`Resource::is_modified`] builds the stability check on top of
//! those signals — filesystem timestamps alone are not reliable enough to
//! tell a finished save from a write still in progress.

use std::fs::{self, File};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::assets::AssetStore;
use crate::config::Settings;
use crate::error::{ResourceError, Result};
use crate::history::{Version, VersionHistory};

/// Whether a resource can ever reload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceScope {
    /// Ordinary project file; reloads when the backing file changes.
    Mutable,
    /// Backed by the embedded asset store; loaded at most once.
    Immutable,
}

/// A resolved reference to a logical path, disk- or asset-backed.
///
/// The resolved target is fixed at construction; a handle is never
/// re-pointed. Existence and kind are re-checked lazily on each query
/// because backing files can appear, disappear or change at any time.
#[derive(Debug)]
pub struct Resource {
    logical_path: String,
    resolved_path: PathBuf,
    scope: ResourceScope,
    asset: Option<Arc<[u8]>>,
    grace_period: Duration,
    last_observed_size: u64,
    size_changed_at: Option<SystemTime>,
    last_successful_load_at: Option<SystemTime>,
    history: VersionHistory,
}

impl Resource {
    /// Resolve a logical path against the project root, the literal path
    /// and the asset store, in that order. The handle is constructed even
    /// when nothing currently resolves; loads will then fail until a
    /// backing file appears.
    pub fn resolve(
        logical_path: impl Into<String>,
        settings: &Settings,
        assets: &AssetStore,
    ) -> Self {
        let logical_path = logical_path.into();

        let project_relative = settings.project_root.join(&logical_path);
        let (resolved_path, scope, asset) = if project_relative.exists() {
            (project_relative, ResourceScope::Mutable, None)
        } else if Path::new(&logical_path).exists() {
            (PathBuf::from(&logical_path), ResourceScope::Mutable, None)
        } else if let Some(asset) = assets.get(&logical_path) {
            (
                PathBuf::from(&logical_path),
                ResourceScope::Immutable,
                Some(asset.data().clone()),
            )
        } else {
            (PathBuf::from(&logical_path), ResourceScope::Mutable, None)
        };

        Self {
            logical_path,
            resolved_path,
            scope,
            asset,
            grace_period: settings.file_modify_grace_period,
            last_observed_size: 0,
            size_changed_at: None,
            last_successful_load_at: None,
            history: VersionHistory::new(settings.file_history_depth),
        }
    }

    /// The logical path this handle was resolved from.
    pub fn logical_path(&self) -> &str {
        &self.logical_path
    }

    /// The concrete path in use. For asset-backed handles this is the
    /// logical path itself; no file behind it is ever opened.
    pub fn resolved_path(&self) -> &Path {
        &self.resolved_path
    }

    pub fn scope(&self) -> ResourceScope {
        self.scope
    }

    /// File name component, or the whole path when there is none.
    pub fn name(&self) -> String {
        self.resolved_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.resolved_path.to_string_lossy().into_owned())
    }

    /// Lowercased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.resolved_path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    /// Override the stability grace period for this handle.
    pub fn set_modify_grace_period(&mut self, grace_period: Duration) {
        self.grace_period = grace_period;
    }

    pub fn exists(&self) -> bool {
        if self.asset.is_some() {
            return true;
        }

        self.resolved_path.exists()
    }

    pub fn is_file(&self) -> bool {
        if self.asset.is_some() {
            return true;
        }

        fs::metadata(&self.resolved_path)
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    pub fn is_dir(&self) -> bool {
        if self.asset.is_some() {
            return false;
        }

        fs::metadata(&self.resolved_path)
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Current content length in bytes.
    ///
    /// For mutable handles the size comes from open + seek-to-end, not
    /// from cached metadata: metadata size fields are not guaranteed to
    /// reflect an in-progress write on all platforms. Every query compares
    /// against the last observed size and stamps the change time on
    /// mismatch.
    pub fn len(&mut self) -> u64 {
        if let Some(asset) = &self.asset {
            return asset.len() as u64;
        }

        let size = File::open(&self.resolved_path)
            .and_then(|mut f| f.seek(SeekFrom::End(0)))
            .unwrap_or(0);

        if size != self.last_observed_size {
            self.size_changed_at = Some(SystemTime::now());
            self.last_observed_size = size;
        }

        size
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Effective modification time: the maximum of the platform's modified
    /// and creation timestamps and the last observed size change. The size
    /// signal can only push the result forward, guarding against platforms
    /// whose file times lag behind reality. Asset-backed and missing files
    /// report the epoch.
    pub fn last_modified(&mut self) -> SystemTime {
        if self.asset.is_some() {
            return UNIX_EPOCH;
        }

        let Ok(metadata) = fs::metadata(&self.resolved_path) else {
            return UNIX_EPOCH;
        };

        // probe the size so an ongoing write refreshes the change stamp
        self.len();

        let mut modified = metadata.modified().unwrap_or(UNIX_EPOCH);
        if let Ok(created) = metadata.created() {
            modified = modified.max(created);
        }
        if let Some(size_changed) = self.size_changed_at {
            modified = modified.max(size_changed);
        }

        modified
    }

    /// Whether at least one version has been read into history.
    pub fn is_loaded(&self) -> bool {
        !self.history.is_empty()
    }

    /// Stability check: has the backing file changed since the last
    /// successful load, and has the change settled?
    ///
    /// Returns `false` for handles that were never loaded. When a change
    /// is detected, this blocks the calling thread in `grace_period`
    /// steps until two consecutive measurements of the effective
    /// modification time agree, so a file still being written is not
    /// reported as modified. Keep this off latency-critical paths.
    pub fn is_modified(&mut self) -> bool {
        if !self.is_loaded() {
            return false;
        }

        let loaded_at = match self.last_successful_load_at {
            Some(at) => at,
            None => return false,
        };

        let modified_at = self.last_modified();
        if modified_at <= loaded_at {
            return false;
        }

        // settle: re-measure until two consecutive readings agree
        let mut previous = modified_at;
        let mut waits = 0;
        loop {
            std::thread::sleep(self.grace_period);
            waits += 1;

            let current = self.last_modified();
            if current == previous {
                break;
            }
            previous = current;
        }

        log::info!(
            "File is modified! '{}', waits:{}",
            self.resolved_path.display(),
            waits
        );

        true
    }

    /// Read the full content from the resolved source and append it to
    /// history as a new version. Does not touch the load timestamp; that
    /// is the committing caller's job.
    ///
    /// Asset-backed handles append at most once — embedded content never
    /// changes at runtime, so a second call is a logged no-op.
    pub fn load_raw(&mut self) -> Result<()> {
        if let Some(asset) = &self.asset {
            if self.is_loaded() {
                log::debug!("Embedded resource '{}' already loaded", self.logical_path);
                return Ok(());
            }

            if asset.is_empty() {
                return Err(ResourceError::EmptyFile(self.resolved_path.clone()));
            }

            let data = asset.to_vec();
            self.history.append(data);
            return Ok(());
        }

        let expected = self.len();
        let data = fs::read(&self.resolved_path).map_err(|source| {
            if !self.exists() {
                log::warn!("File '{}' does not exist.", self.resolved_path.display());
                ResourceError::NotFound(self.resolved_path.clone())
            } else {
                log::error!(
                    "Could not open file '{}' for reading.",
                    self.resolved_path.display()
                );
                ResourceError::Read {
                    path: self.resolved_path.clone(),
                    source,
                }
            }
        })?;

        if data.is_empty() {
            log::warn!(
                "Can't read '{}' to data. File is empty.",
                self.resolved_path.display()
            );
            return Err(ResourceError::EmptyFile(self.resolved_path.clone()));
        }

        if (data.len() as u64) < expected {
            log::error!(
                "Could not read file '{}'. readBytes:{}, fileSize:{}",
                self.resolved_path.display(),
                data.len(),
                expected
            );
            return Err(ResourceError::ShortRead {
                path: self.resolved_path.clone(),
                expected,
                got: data.len() as u64,
            });
        }

        self.history.append(data);
        Ok(())
    }

    /// Load and commit in one step, for resources without an activation
    /// phase. The load timestamp is captured before reading so an edit
    /// racing the read is detected on the next poll.
    pub fn load(&mut self) -> Result<()> {
        let modified_at = self.last_modified();
        self.load_raw()?;
        self.last_successful_load_at = Some(modified_at);
        Ok(())
    }

    /// The currently newest version: committed content, or the pending
    /// version while an activation is in flight.
    pub fn data(&self) -> Option<&Version> {
        self.history.current()
    }

    /// Read access to the retained versions.
    pub fn history(&self) -> &VersionHistory {
        &self.history
    }

    pub(crate) fn history_mut(&mut self) -> &mut VersionHistory {
        &mut self.history
    }

    pub(crate) fn stamp_load_time(&mut self, at: SystemTime) {
        self.last_successful_load_at = Some(at);
    }

    /// When the currently active version was accepted, if ever.
    pub fn last_successful_load_at(&self) -> Option<SystemTime> {
        self.last_successful_load_at
    }

    /// Enumerate the immediate children of a directory handle. Children
    /// are resolved like any other logical path and included only if they
    /// currently exist. Not recursive; filesystem enumeration order.
    pub fn list(&self, settings: &Settings, assets: &AssetStore) -> Vec<Resource> {
        let mut children = Vec::new();

        if !self.is_dir() {
            return children;
        }

        let Ok(entries) = fs::read_dir(&self.resolved_path) else {
            return children;
        };

        for entry in entries.flatten() {
            let path = entry.path().to_string_lossy().into_owned();
            let child = Resource::resolve(path, settings, assets);
            if child.exists() {
                children.push(child);
            }
        }

        children
    }
}
