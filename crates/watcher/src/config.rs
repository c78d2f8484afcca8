//! Watcher options

use crate::error::{Result, WatchError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settle duration is always this multiple of the poll interval
///
/// A path is only declared settled after a full poll cycle has gone by
/// without a change, and a poll itself lags by up to one interval.
pub const SETTLE_FACTOR: u32 = 2;

/// Configuration for a [`Watcher`](crate::Watcher)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Folders to observe (at least one)
    pub root_folders: Vec<PathBuf>,

    /// Folder-name fragments to skip, matched on whole path segments
    #[serde(default)]
    pub folder_exclusions: Vec<String>,

    /// Observe folders whose name starts with `.` (default: false)
    #[serde(default)]
    pub include_hidden: bool,

    /// Observe only the roots themselves (default: false)
    #[serde(default)]
    pub exclude_subdirs: bool,

    /// Start observing folders created while running (default: false)
    #[serde(default)]
    pub follow_new_folders: bool,

    /// How often the raw source polls
    #[serde(rename = "poll_interval_ms", with = "duration_ms")]
    pub poll_interval: Duration,
}

impl Options {
    /// Options for `roots` with every flag off
    pub fn new<I, P>(roots: I, poll_interval: Duration) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            root_folders: roots.into_iter().map(Into::into).collect(),
            folder_exclusions: Vec::new(),
            include_hidden: false,
            exclude_subdirs: false,
            follow_new_folders: false,
            poll_interval,
        }
    }

    /// Add a folder exclusion pattern
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.folder_exclusions.push(pattern.into());
        self
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn exclude_subdirs(mut self, exclude: bool) -> Self {
        self.exclude_subdirs = exclude;
        self
    }

    pub fn follow_new_folders(mut self, follow: bool) -> Self {
        self.follow_new_folders = follow;
        self
    }

    /// Quiet period before a path counts as settled
    pub fn settle_duration(&self) -> Duration {
        self.poll_interval * SETTLE_FACTOR
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.root_folders.is_empty() {
            return Err(WatchError::Config(
                "at least one root folder is required".to_string(),
            ));
        }
        if let Some(empty) = self.root_folders.iter().find(|root| root.as_os_str().is_empty()) {
            return Err(WatchError::Config(format!(
                "root folder must not be empty: {:?}",
                empty
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(WatchError::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// (De)serialize a `Duration` as whole milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
