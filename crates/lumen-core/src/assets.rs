//! Embedded asset store.
//!
//! The asset store maps logical paths to byte blobs compiled into the
//! binary. It is the fallback source of truth when a resource has no
//! backing file on disk, which is what makes a packaged build run the same
//! consumer code as a live project directory.
//!
//! The store is populated once at startup, before any resource resolution
//! happens, and is read-only afterwards. It is an explicitly constructed
//! value passed by reference — there is no hidden global.

use std::collections::HashMap;
use std::sync::Arc;

/// A single registered asset: a logical path and its immutable content.
#[derive(Clone, Debug)]
pub struct EmbeddedAsset {
    logical_path: String,
    data: Arc<[u8]>,
}

impl EmbeddedAsset {
    /// The logical path this asset was registered under.
    pub fn logical_path(&self) -> &str {
        &self.logical_path
    }

    /// The asset content. Shared, immutable for the process lifetime.
    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }

    /// Content length in bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Mapping from logical path to embedded content.
#[derive(Default)]
pub struct AssetStore {
    assets: HashMap<String, EmbeddedAsset>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset. The last registration for a path wins; replacing
    /// an existing entry is legal but worth a warning.
    pub fn register(&mut self, logical_path: impl Into<String>, data: impl Into<Arc<[u8]>>) {
        let logical_path = logical_path.into();

        if self.assets.contains_key(&logical_path) {
            log::warn!("Embedded asset '{}' exists. Replacing.", logical_path);
        }

        let asset = EmbeddedAsset {
            logical_path: logical_path.clone(),
            data: data.into(),
        };
        self.assets.insert(logical_path, asset);
    }

    /// Look up an asset by its logical path.
    pub fn get(&self, logical_path: &str) -> Option<&EmbeddedAsset> {
        self.assets.get(logical_path)
    }

    pub fn contains(&self, logical_path: &str) -> bool {
        self.assets.contains_key(logical_path)
    }

    /// Number of registered assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Iterate over all registered assets in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &EmbeddedAsset> {
        self.assets.values()
    }
}
