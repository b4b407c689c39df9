//! Lumen Standard Assets.
//!
//! This crate embeds the default project files at compile time and knows
//! how to register them into an [`AssetStore`]. A packaged binary carries
//! these blobs as its fallback: when a logical path has no backing file on
//! disk, resolution falls through to the store and the consumer never
//! notices the difference.
//!
//! # Usage
//!
//! ```no_run
//! let mut store = lumen_core::AssetStore::new();
//! let count = lumen_std::register_embedded(&mut store);
//! println!("registered {count} embedded asset(s)");
//! ```

use include_dir::{include_dir, Dir};
use lumen_core::AssetStore;

/// Embedded asset directory (compiled into the binary)
static ASSETS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// Logical path of the default entry script.
pub const DEFAULT_SCRIPT: &str = "demo.rhai";

/// Get the embedded asset directory for direct access.
///
/// This can be used to list files or read content without going through
/// an [`AssetStore`].
pub fn embedded_assets() -> &'static Dir<'static> {
    &ASSETS_DIR
}

/// Register every embedded file into the store under its relative path.
/// Returns the number of files registered.
pub fn register_embedded(store: &mut AssetStore) -> usize {
    register_dir(&ASSETS_DIR, store)
}

/// Recursively register a directory.
fn register_dir(dir: &Dir<'static>, store: &mut AssetStore) -> usize {
    let mut count = 0;

    for file in dir.files() {
        store.register(file.path().to_string_lossy().into_owned(), file.contents());
        count += 1;
    }

    for subdir in dir.dirs() {
        count += register_dir(subdir, store);
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_assets_have_content() {
        let dir = embedded_assets();
        assert!(dir.files().count() > 0 || dir.dirs().count() > 0);
    }

    #[test]
    fn test_register_embedded_populates_store() {
        let mut store = AssetStore::new();
        let count = register_embedded(&mut store);

        assert!(count > 0);
        assert_eq!(store.len(), count);
        assert!(store.contains(DEFAULT_SCRIPT));
        assert!(!store.get(DEFAULT_SCRIPT).unwrap().is_empty());
    }

    #[test]
    fn test_nested_assets_keep_relative_paths() {
        let mut store = AssetStore::new();
        register_embedded(&mut store);

        assert!(store.contains("util/ease.rhai"));
    }
}
