//! Debounced file system watching for settle
//!
//! This crate turns a noisy stream of raw change records into settled
//! "this path stopped changing" notifications:
//! - Folder discovery with hidden-folder and exclusion pruning
//! - Per-path debouncing (settle = 2 × poll interval)
//! - Parent folder notification for every file change
//! - Optional following of folders created while running
//!
//! Every stream in [`Notifications`] has to be drained: a settled path
//! waits until its stream has room, so an unread stream keeps its timer
//! tasks alive.
//!
//! ```no_run
//! use std::time::Duration;
//! use watcher::{Options, Watcher};
//!
//! # async fn run() -> watcher::Result<()> {
//! let options = Options::new(["src"], Duration::from_millis(100)).exclude("target");
//! let (watcher, mut notifications) = Watcher::new(options)?;
//! watcher.start()?;
//!
//! loop {
//!     tokio::select! {
//!         Some(path) = notifications.files.recv() => println!("file changed {}", path.display()),
//!         Some(path) = notifications.folders.recv() => println!("folder changed {}", path.display()),
//!         Some(err) = notifications.errors.recv() => println!("error {err}"),
//!         else => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
mod debounce;
pub mod discover;
pub mod error;
pub mod event;
pub mod ignore;
mod lifecycle;
pub mod source;
mod watcher;

pub use config::Options;
pub use discover::discover;
pub use error::{Result, WatchError};
pub use event::{classify, Op, RawEvent};
pub use ignore::FolderExclusions;
pub use lifecycle::State;
pub use source::{ManualSource, PollSource, RawFeed, RawReceiver, RawSource};
pub use watcher::{Notifications, Watcher};
