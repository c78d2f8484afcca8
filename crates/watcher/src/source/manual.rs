//! Raw source fed by hand
//!
//! Lets another detection mechanism (or a test) push raw records into a
//! watcher.

use super::{RawReceiver, RawSender, RawSource};
use crate::error::WatchError;
use crate::event::RawEvent;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Raw source whose events come from a [`RawFeed`]
pub struct ManualSource {
    sender: Arc<Mutex<Option<RawSender>>>,
    registered: Arc<Mutex<Vec<PathBuf>>>,
}

/// Handle for pushing records into a [`ManualSource`]
#[derive(Clone)]
pub struct RawFeed {
    sender: Arc<Mutex<Option<RawSender>>>,
    registered: Arc<Mutex<Vec<PathBuf>>>,
}

impl ManualSource {
    pub fn new() -> (Self, RawFeed, RawReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = Arc::new(Mutex::new(Some(tx)));
        let registered = Arc::new(Mutex::new(Vec::new()));

        let source = Self {
            sender: Arc::clone(&sender),
            registered: Arc::clone(&registered),
        };
        let feed = RawFeed { sender, registered };
        (source, feed, rx)
    }
}

impl RawSource for ManualSource {
    fn add(&self, path: &Path) -> notify::Result<()> {
        if self.sender.lock().is_none() {
            return Err(notify::Error::generic("manual source is closed"));
        }
        self.registered.lock().push(path.to_path_buf());
        Ok(())
    }

    fn close(&self) {
        self.sender.lock().take();
    }
}

impl RawFeed {
    /// Push a raw change. Returns false once the source is closed.
    pub fn event(&self, event: RawEvent) -> bool {
        self.send(Ok(event))
    }

    /// Push a source error. Returns false once the source is closed.
    pub fn error(&self, error: WatchError) -> bool {
        self.send(Err(error))
    }

    /// End the raw stream, as if the source shut down on its own
    pub fn close(&self) {
        self.sender.lock().take();
    }

    /// Folders registered with the source so far, in registration order
    pub fn registered(&self) -> Vec<PathBuf> {
        self.registered.lock().clone()
    }

    fn send(&self, signal: super::RawSignal) -> bool {
        match self.sender.lock().as_ref() {
            Some(tx) => tx.send(signal).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Op;

    #[test]
    fn test_feed_reaches_receiver() {
        let (source, feed, mut raw) = ManualSource::new();
        source.add(Path::new("/watched")).unwrap();

        assert!(feed.event(RawEvent::new(Op::Write, "/watched/a", false)));
        assert!(feed.error(WatchError::Source(notify::Error::generic("boom"))));

        assert_eq!(raw.try_recv().unwrap().unwrap().path, "/watched/a");
        assert!(raw.try_recv().unwrap().is_err());
        assert_eq!(feed.registered(), vec![PathBuf::from("/watched")]);
    }

    #[test]
    fn test_close_ends_stream_and_rejects_work() {
        let (source, feed, mut raw) = ManualSource::new();
        source.close();

        assert!(!feed.event(RawEvent::new(Op::Write, "/x", false)));
        assert!(source.add(Path::new("/x")).is_err());
        assert!(matches!(
            raw.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
