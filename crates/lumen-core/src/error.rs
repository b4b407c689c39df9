//! Error types for the lumen-core crate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving, loading or activating resources.
///
/// Resolution and read errors are local: they abort the current load attempt
/// and leave the previously committed version untouched. Activation errors
/// trigger a single rollback; a rollback error is terminal for the attempt
/// but never for the process.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The logical path matches neither the project directory nor the
    /// embedded asset store.
    #[error("Resource does not exist: {0}")]
    NotFound(PathBuf),

    /// The resolved path exists but is not a regular file.
    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    /// Underlying I/O failure while reading the resource.
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The backing file exists but contains no bytes.
    #[error("File is empty: {0}")]
    EmptyFile(PathBuf),

    /// Fewer bytes than the measured size could be read. The file is most
    /// likely being rewritten right now.
    #[error("Short read on {path}: expected {expected} bytes, got {got}")]
    ShortRead {
        path: PathBuf,
        expected: u64,
        got: u64,
    },

    /// The file extension is not handled by the evaluator.
    #[error("File type not supported: {0}")]
    Unsupported(PathBuf),

    /// The evaluator rejected a freshly loaded version and no previous
    /// version was available to fall back to.
    #[error("Activation failed for {path}: {message}")]
    Activation { path: PathBuf, message: String },

    /// The previous version also failed to activate. No further retry is
    /// attempted; the consumer keeps whatever state it retained.
    #[error("Rollback failed for {path}: {message}")]
    Rollback { path: PathBuf, message: String },

    /// A history version further back than what is retained was requested.
    #[error("No version {steps} step(s) behind current")]
    NoSuchVersion { steps: usize },
}

/// Result type alias using ResourceError.
pub type Result<T> = std::result::Result<T, ResourceError>;
