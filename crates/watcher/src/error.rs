//! Error types for the watcher

use crate::lifecycle::State;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors surfaced by the watcher
#[derive(Error, Debug)]
pub enum WatchError {
    /// Options failed validation
    #[error("invalid watcher options: {0}")]
    Config(String),

    /// A root (or a folder below it) could not be walked
    #[error("error determining watch folders: {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The raw source refused to observe a folder
    #[error("error adding watch folder {}: {source}", path.display())]
    Registration {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// Runtime error reported by the raw source
    #[error("watch source error: {0}")]
    Source(#[from] notify::Error),

    /// Lifecycle call made from the wrong state
    #[error("watcher is {actual}, expected {expected}")]
    InvalidState { expected: State, actual: State },

    /// `start` was called outside a tokio runtime
    #[error("watcher must be started inside a tokio runtime: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}
