//! Watcher facade
//!
//! Ties discovery, the raw source, classification and debouncing together
//! and owns the lifecycle. A single dispatch task drains the raw source;
//! everything it does per event is synchronous apart from forwarding errors.

use crate::config::Options;
use crate::debounce::{Debouncer, OUTPUT_CAPACITY};
use crate::discover::discover;
use crate::error::{Result, WatchError};
use crate::event::{classify, RawEvent};
use crate::ignore::{is_hidden, FolderExclusions};
use crate::lifecycle::{Lifecycle, State};
use crate::source::{PollSource, RawReceiver, RawSource};
use parking_lot::{Mutex, RwLock};
use path_absolutize::Absolutize;
use std::collections::BTreeSet;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Streams handed to the consumer
///
/// Every stream ends once the watcher is closed. Read all of them: a
/// settled path is held until its stream has room.
#[derive(Debug)]
pub struct Notifications {
    /// Files that changed and then stayed unchanged for the settle duration
    pub files: mpsc::Receiver<PathBuf>,
    /// Folders that changed (directly or through a child file) and settled
    pub folders: mpsc::Receiver<PathBuf>,
    /// Non-fatal runtime errors
    pub errors: mpsc::Receiver<WatchError>,
}

/// Debounced watcher over a set of root folders
pub struct Watcher<S: RawSource = PollSource> {
    inner: Arc<Inner<S>>,
    /// Taken by `start`
    raw: Mutex<Option<RawReceiver>>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
}

struct Inner<S> {
    options: Options,
    exclusions: FolderExclusions,
    source: S,
    /// Absolute paths of every folder registered with the source
    watched: RwLock<BTreeSet<PathBuf>>,
    debouncer: Debouncer,
    /// `None` once closed
    errors: Mutex<Option<mpsc::Sender<WatchError>>>,
    lifecycle: Lifecycle,
}

impl Watcher<PollSource> {
    /// Create a watcher polling the folders described by `options`
    pub fn new(options: Options) -> Result<(Self, Notifications)> {
        let (source, raw) = PollSource::new(options.poll_interval)?;
        Self::with_source(options, source, raw)
    }
}

impl<S: RawSource> Watcher<S> {
    /// Create a watcher on top of an existing raw source
    ///
    /// Discovers the folders to observe and registers each of them with
    /// `source`. Any failure aborts construction and closes the source.
    pub fn with_source(options: Options, source: S, raw: RawReceiver) -> Result<(Self, Notifications)> {
        options.validate()?;
        let exclusions = FolderExclusions::new(&options.folder_exclusions);

        let watched = match register_all(&options, &exclusions, &source) {
            Ok(watched) => watched,
            Err(err) => {
                source.close();
                return Err(err);
            }
        };

        let lifecycle = Lifecycle::new();
        let (debouncer, files, folders) = Debouncer::new(options.settle_duration(), lifecycle.clone());
        let (errors_tx, errors) = mpsc::channel(OUTPUT_CAPACITY);

        info!(
            "Watching {} folders under {} roots (settle {:?})",
            watched.len(),
            options.root_folders.len(),
            options.settle_duration()
        );

        let inner = Arc::new(Inner {
            options,
            exclusions,
            source,
            watched: RwLock::new(watched),
            debouncer,
            errors: Mutex::new(Some(errors_tx)),
            lifecycle,
        });

        let watcher = Self {
            inner,
            raw: Mutex::new(Some(raw)),
            dispatch: Mutex::new(None),
        };
        let notifications = Notifications {
            files,
            folders,
            errors,
        };
        Ok((watcher, notifications))
    }

    /// Start processing raw events
    ///
    /// Spawns the dispatch task on the current tokio runtime. Only valid
    /// once, from `Constructed`.
    pub fn start(&self) -> Result<()> {
        let handle = Handle::try_current()?;
        self.inner.lifecycle.begin_running()?;

        let raw = self.raw.lock().take().ok_or(WatchError::InvalidState {
            expected: State::Constructed,
            actual: self.state(),
        })?;

        let inner = Arc::clone(&self.inner);
        let task = handle.spawn(dispatch(inner, raw));
        *self.dispatch.lock() = Some(task);

        debug!("Watcher started");
        Ok(())
    }

    /// Close the watcher
    ///
    /// Closes the raw source, abandons pending notifications and ends every
    /// output stream. Safe to call more than once.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Resolves once the watcher is closed, whoever closed it
    pub fn closed(&self) -> impl Future<Output = ()> + Send + 'static {
        self.inner.lifecycle.closed()
    }

    pub fn state(&self) -> State {
        self.inner.lifecycle.state()
    }

    /// Folders currently observed: absolute, sorted, without duplicates
    pub fn watch_folders(&self) -> Vec<PathBuf> {
        self.inner.watched.read().iter().cloned().collect()
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }
}

impl<S: RawSource> Drop for Watcher<S> {
    fn drop(&mut self) {
        self.inner.close();
        // The dispatch task exits on its own once it sees the close
        self.dispatch.lock().take();
    }
}

/// Discover and register the initial folder set
fn register_all<S: RawSource>(
    options: &Options,
    exclusions: &FolderExclusions,
    source: &S,
) -> Result<BTreeSet<PathBuf>> {
    let discovered = discover(
        &options.root_folders,
        options.exclude_subdirs,
        options.include_hidden,
        exclusions,
    )?;

    let mut watched = BTreeSet::new();
    for folder in discovered {
        let folder = absolute(&folder)?;
        if watched.contains(&folder) {
            continue;
        }

        source
            .add(&folder)
            .map_err(|source| WatchError::Registration {
                path: folder.clone(),
                source,
            })?;
        debug!("Registered {}", folder.display());
        watched.insert(folder);
    }

    Ok(watched)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    path.absolutize()
        .map(|absolute| absolute.into_owned())
        .map_err(|source| WatchError::Discovery {
            path: path.to_path_buf(),
            source,
        })
}

/// Drain the raw source until it ends or the watcher closes
async fn dispatch<S: RawSource>(inner: Arc<Inner<S>>, mut raw: RawReceiver) {
    let closed = inner.lifecycle.closed();
    tokio::pin!(closed);

    loop {
        let signal = tokio::select! {
            _ = &mut closed => break,
            signal = raw.recv() => signal,
        };

        match signal {
            Some(Ok(event)) => inner.handle_event(event).await,
            Some(Err(err)) => inner.report(err).await,
            None => {
                debug!("Raw source ended");
                inner.close();
                break;
            }
        }
    }

    trace!("Dispatch task exiting");
}

impl<S: RawSource> Inner<S> {
    async fn handle_event(&self, event: RawEvent) {
        let Some(path) = classify(&event) else {
            trace!("Dropping unclassifiable {} event: {:?}", event.op, event.path);
            return;
        };
        trace!("{} {}", event.op, path.display());

        self.debouncer.record(&path, event.is_dir);

        if event.is_dir && event.op.creates_path() && self.options.follow_new_folders {
            self.extend(&path).await;
        }
    }

    /// Register a newly created folder and, unless only roots' own folders
    /// are watched, its subtree
    ///
    /// Hidden and excluded folders are skipped the same way discovery skips
    /// them. Failures are forwarded on the error stream.
    async fn extend(&self, folder: &Path) {
        if self.options.exclude_subdirs && self.is_skipped(folder) {
            trace!("Not following skipped folder {}", folder.display());
            return;
        }

        let found = match discover(
            &[folder.to_path_buf()],
            self.options.exclude_subdirs,
            self.options.include_hidden,
            &self.exclusions,
        ) {
            Ok(found) => found,
            Err(WatchError::Discovery { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                debug!("New folder already gone: {}", folder.display());
                return;
            }
            Err(err) => {
                warn!("Failed to follow new folder {}: {}", folder.display(), err);
                self.report(err).await;
                return;
            }
        };

        for path in found {
            if self.watched.read().contains(&path) {
                continue;
            }

            match self.source.add(&path) {
                Ok(()) => {
                    debug!("Following new folder {}", path.display());
                    self.watched.write().insert(path);
                }
                Err(source) => {
                    let err = WatchError::Registration { path, source };
                    warn!("{}", err);
                    self.report(err).await;
                }
            }
        }
    }

    fn is_skipped(&self, folder: &Path) -> bool {
        (!self.options.include_hidden && is_hidden(folder)) || self.exclusions.is_excluded(folder)
    }

    /// Forward a runtime error, waiting for the consumer unless closed first
    async fn report(&self, err: WatchError) {
        let Some(errors) = self.errors.lock().clone() else {
            return;
        };

        let closed = self.lifecycle.closed();
        tokio::select! {
            _ = closed => debug!("Dropping error after close"),
            sent = errors.send(err) => {
                if sent.is_err() {
                    debug!("Dropping error: receiver gone");
                }
            }
        }
    }

    fn close(&self) {
        if !self.lifecycle.close() {
            return;
        }

        self.source.close();
        self.debouncer.close();
        self.errors.lock().take();
        info!("Watcher closed");
    }
}
