//! Per-path debouncing
//!
//! Every path gets at most one pending deadline per kind (file or folder).
//! A repeat event moves the deadline instead of arming a second timer. Each
//! live entry is owned by one spawned task that sleeps until the deadline,
//! re-checks it under the lock, and either sleeps again (the entry was
//! reset meanwhile) or removes the entry and publishes the path.
//!
//! The table lock is only held to read or mutate the maps, never across a
//! sleep or a publish.

use crate::lifecycle::Lifecycle;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Capacity of each output stream
///
/// Tokio has no rendezvous channel; a single slot is the closest thing to
/// handing the path straight to the consumer.
pub(crate) const OUTPUT_CAPACITY: usize = 1;

/// Which map a debounce entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    File,
    Folder,
}

/// Debounce table plus the output streams it feeds
pub(crate) struct Debouncer {
    shared: Arc<Shared>,
}

struct Shared {
    /// Quiet period a path needs before it is published
    settle: Duration,
    table: Mutex<Table>,
    lifecycle: Lifecycle,
}

struct Table {
    files: HashMap<PathBuf, Instant>,
    folders: HashMap<PathBuf, Instant>,
    /// `None` once closed
    outputs: Option<Outputs>,
}

struct Outputs {
    files: mpsc::Sender<PathBuf>,
    folders: mpsc::Sender<PathBuf>,
}

impl Table {
    fn map(&mut self, kind: Kind) -> &mut HashMap<PathBuf, Instant> {
        match kind {
            Kind::File => &mut self.files,
            Kind::Folder => &mut self.folders,
        }
    }
}

/// What a woken timer task should do next
enum Expiry {
    /// Entry was reset; sleep until the new deadline
    Wait(Instant),
    /// Entry removed; publish through this sender
    Fire(mpsc::Sender<PathBuf>),
    /// Entry gone (closed)
    Gone,
}

impl Debouncer {
    /// Create a debouncer and the file and folder streams it publishes to
    pub(crate) fn new(
        settle: Duration,
        lifecycle: Lifecycle,
    ) -> (Self, mpsc::Receiver<PathBuf>, mpsc::Receiver<PathBuf>) {
        let (files_tx, files_rx) = mpsc::channel(OUTPUT_CAPACITY);
        let (folders_tx, folders_rx) = mpsc::channel(OUTPUT_CAPACITY);

        let shared = Arc::new(Shared {
            settle,
            table: Mutex::new(Table {
                files: HashMap::new(),
                folders: HashMap::new(),
                outputs: Some(Outputs {
                    files: files_tx,
                    folders: folders_tx,
                }),
            }),
            lifecycle,
        });

        (Self { shared }, files_rx, folders_rx)
    }

    /// Record a change to `path`
    ///
    /// A folder change arms the folder entry for `path`. A file change arms
    /// the file entry for `path` and the folder entry for its parent, since
    /// the containing folder changed too. Must be called inside a tokio
    /// runtime.
    pub(crate) fn record(&self, path: &Path, is_dir: bool) {
        let deadline = Instant::now() + self.shared.settle;
        let mut table = self.shared.table.lock();
        if table.outputs.is_none() {
            return;
        }

        if is_dir {
            self.arm(&mut table, Kind::Folder, path, deadline);
        } else {
            self.arm(&mut table, Kind::File, path, deadline);
            if let Some(parent) = path.parent() {
                self.arm(&mut table, Kind::Folder, parent, deadline);
            }
        }
    }

    fn arm(&self, table: &mut Table, kind: Kind, path: &Path, deadline: Instant) {
        match table.map(kind).entry(path.to_path_buf()) {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() = deadline;
                trace!("Debounce reset for {:?} {}", kind, path.display());
            }
            Entry::Vacant(entry) => {
                entry.insert(deadline);
                trace!("Debounce armed for {:?} {}", kind, path.display());

                let shared = Arc::clone(&self.shared);
                let path = path.to_path_buf();
                tokio::spawn(async move {
                    let closed = shared.lifecycle.closed();
                    tokio::select! {
                        _ = closed => {}
                        _ = shared.settle_then_publish(kind, path, deadline) => {}
                    }
                });
            }
        }
    }

    /// Drop every pending entry and both output senders
    ///
    /// Pending notifications are abandoned. The output streams end once no
    /// timer task holds a sender any more, which happens as soon as those
    /// tasks observe the closed lifecycle.
    pub(crate) fn close(&self) {
        let mut table = self.shared.table.lock();
        let abandoned = table.files.len() + table.folders.len();
        table.files.clear();
        table.folders.clear();
        table.outputs = None;

        if abandoned > 0 {
            debug!("Abandoned {} pending debounce timers", abandoned);
        }
    }

    /// Number of pending (file, folder) entries
    #[cfg(test)]
    pub(crate) fn pending(&self) -> (usize, usize) {
        let table = self.shared.table.lock();
        (table.files.len(), table.folders.len())
    }
}

impl Shared {
    async fn settle_then_publish(&self, kind: Kind, path: PathBuf, mut deadline: Instant) {
        let sender = loop {
            tokio::time::sleep_until(deadline).await;
            match self.expire(kind, &path, deadline) {
                Expiry::Wait(next) => deadline = next,
                Expiry::Fire(sender) => break sender,
                Expiry::Gone => return,
            }
        };

        // Deleted while we waited: nothing settled
        if let Err(err) = std::fs::metadata(&path) {
            if err.kind() == io::ErrorKind::NotFound {
                debug!("Skipping {} (no longer exists)", path.display());
                return;
            }
        }

        trace!("Settled {:?} {}", kind, path.display());
        if sender.send(path).await.is_err() {
            debug!("Dropping {:?} notification: receiver gone", kind);
        }
    }

    /// Re-check a woken entry under the lock, removing it if it expired
    fn expire(&self, kind: Kind, path: &Path, deadline: Instant) -> Expiry {
        let mut table = self.table.lock();
        let map = table.map(kind);

        let latest = match map.get(path) {
            Some(&latest) => latest,
            None => return Expiry::Gone,
        };
        if latest > deadline {
            return Expiry::Wait(latest);
        }
        map.remove(path);

        match &table.outputs {
            Some(outputs) => Expiry::Fire(match kind {
                Kind::File => outputs.files.clone(),
                Kind::Folder => outputs.folders.clone(),
            }),
            None => Expiry::Gone,
        }
    }
}
