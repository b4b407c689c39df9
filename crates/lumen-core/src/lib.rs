//! Lumen Core - resource resolution, versioning and live reload.
//!
//! This crate is the engine behind Lumen's edit-and-retry workflow:
//!
//! - **Assets** - compile-time blob store, the fallback behind packaged builds
//! - **Resources** - logical paths resolved to disk files or embedded blobs
//! - **History** - bounded per-resource version retention with FIFO eviction
//! - **Scripts** - the reload/rollback controller over a script evaluator
//! - **Refresh** - poll-driven sweep over all reloadable scripts
//! - **Diff** - external diff tool invocation for operator diagnostics
//!
//! # Architecture
//!
//! A [`Resource`] resolves a logical path against the project directory,
//! the literal path and the [`AssetStore`], in that order. Reloadable
//! resources track size and modification signals so that a file still
//! being written is never read half-way. Every successful read becomes a
//! version in a bounded [`VersionHistory`]; a [`Script`] activates the
//! newest version through its [`Evaluator`] and falls back to the
//! previous one when activation fails.
//!
//! Each handle is owned by a single logical thread. The only blocking
//! call is the stability check inside [`Script::load`], which waits in
//! grace-period steps for an in-progress write to settle — drive reloads
//! from a coarse polling tick, not from a per-frame path.

pub mod assets;
pub mod config;
pub mod diff;
pub mod error;
pub mod history;
pub mod refresh;
pub mod resource;
pub mod script;

// Re-export main types for convenience
pub use assets::{AssetStore, EmbeddedAsset};
pub use config::Settings;
pub use error::{ResourceError, Result};
pub use history::{Version, VersionHistory};
pub use refresh::{RefreshManager, RefreshReport};
pub use resource::{Resource, ResourceScope};
pub use script::rhai::RhaiEvaluator;
pub use script::{EvalResult, Evaluator, LoadOutcome, Script};
