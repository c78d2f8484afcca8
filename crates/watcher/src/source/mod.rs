//! Raw change sources
//!
//! A raw source observes registered folders and reports every individual
//! change. The watcher only needs two things from it: a way to register
//! more folders and a stream of raw signals. The stream ending is the
//! source's "closed" signal.

mod manual;
mod poll;

pub use manual::{ManualSource, RawFeed};
pub use poll::PollSource;

use crate::error::WatchError;
use crate::event::RawEvent;
use std::path::Path;
use tokio::sync::mpsc;

/// One item from a raw source: a change, or an error worth surfacing
pub type RawSignal = std::result::Result<RawEvent, WatchError>;

/// Receiving end of a raw source
pub type RawReceiver = mpsc::UnboundedReceiver<RawSignal>;

/// Sending end of a raw source
pub type RawSender = mpsc::UnboundedSender<RawSignal>;

/// Lower-level change detection the watcher sits on top of
pub trait RawSource: Send + Sync + 'static {
    /// Start observing a folder (non-recursively)
    fn add(&self, path: &Path) -> notify::Result<()>;

    /// Stop observing everything and end the raw stream
    fn close(&self);
}
