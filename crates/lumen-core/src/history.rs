//! Bounded per-resource version history.
//!
//! Every successful read of a resource appends an immutable byte buffer
//! here. The newest entry is the committed version after a successful
//! activation, or the pending version while an activation is in flight.
//! The history owns each buffer for its lifetime; callers only ever get
//! shared read-only access.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{ResourceError, Result};

/// An immutable, length-known content version.
pub type Version = Arc<[u8]>;

/// Ordered sequence of content versions, oldest first, bounded by a
/// configured depth with FIFO eviction.
#[derive(Debug, Default)]
pub struct VersionHistory {
    entries: VecDeque<Version>,
    depth: usize,
}

impl VersionHistory {
    /// Create a history retaining at most `depth` versions. A depth of
    /// zero is clamped to one so the current version can always be kept.
    pub fn new(depth: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            depth: depth.max(1),
        }
    }

    /// Append a new version, evicting the oldest entries beyond the
    /// configured depth. Eviction never touches the entry just appended.
    pub fn append(&mut self, data: Vec<u8>) {
        self.entries.push_back(Version::from(data));

        while self.entries.len() > self.depth {
            self.entries.pop_front();
            log::trace!("Evicted oldest version, {} retained", self.entries.len());
        }
    }

    /// The most recently appended version, if any.
    pub fn current(&self) -> Option<&Version> {
        self.entries.back()
    }

    /// The version `steps` behind current; `from_past(0)` is `current()`.
    pub fn from_past(&self, steps: usize) -> Result<&Version> {
        if steps >= self.entries.len() {
            return Err(ResourceError::NoSuchVersion { steps });
        }

        Ok(&self.entries[self.entries.len() - 1 - steps])
    }

    /// Remove and return the newest entry. Used to drop a pending version
    /// whose activation failed; the previously committed entry below it is
    /// never removed this way.
    pub fn discard_current(&mut self) -> Option<Version> {
        self.entries.pop_back()
    }

    /// Number of retained versions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The configured retention cap.
    pub fn depth(&self) -> usize {
        self.depth
    }
}
