//! Polling raw source backed by `notify::PollWatcher`

use super::{RawReceiver, RawSender, RawSource};
use crate::error::WatchError;
use crate::event::{Op, RawEvent};
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Config, PollWatcher, RecursiveMode, Watcher as _};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Raw source that polls registered folders at a fixed interval
///
/// Each folder is watched non-recursively: the folder itself and its direct
/// children. Subfolders have to be registered on their own, which is what
/// discovery and the new-folder extension do.
pub struct PollSource {
    /// `None` once closed
    watcher: Mutex<Option<PollWatcher>>,
    /// Registered folders, used to tell whether a removed path was a folder
    folders: Arc<RwLock<HashSet<PathBuf>>>,
    interval: Duration,
}

impl PollSource {
    /// Create a source polling every `interval`
    pub fn new(interval: Duration) -> notify::Result<(Self, RawReceiver)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let folders = Arc::new(RwLock::new(HashSet::new()));

        let known = Arc::clone(&folders);
        let watcher = PollWatcher::new(
            move |res: notify::Result<notify::Event>| forward(&tx, &known, res),
            Config::default().with_poll_interval(interval),
        )?;

        let source = Self {
            watcher: Mutex::new(Some(watcher)),
            folders,
            interval,
        };
        Ok((source, rx))
    }

    /// Polling interval
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl RawSource for PollSource {
    fn add(&self, path: &Path) -> notify::Result<()> {
        let mut guard = self.watcher.lock();
        let watcher = guard
            .as_mut()
            .ok_or_else(|| notify::Error::generic("poll source is closed"))?;

        // PollWatcher accepts missing paths and reports them later on the
        // event stream; refuse them here instead.
        std::fs::metadata(path).map_err(|err| notify::Error::io(err).add_path(path.to_path_buf()))?;

        watcher.watch(path, RecursiveMode::NonRecursive)?;
        self.folders.write().insert(path.to_path_buf());
        debug!("Polling {}", path.display());
        Ok(())
    }

    fn close(&self) {
        // Dropping the PollWatcher stops its thread, which drops the event
        // handler and with it the last raw sender.
        if self.watcher.lock().take().is_some() {
            debug!("Poll source closed");
        }
    }
}

fn forward(
    tx: &RawSender,
    known: &RwLock<HashSet<PathBuf>>,
    res: notify::Result<notify::Event>,
) {
    let signal = match res {
        Ok(event) => match translate(event, &known.read()) {
            Some(raw) => Ok(raw),
            None => return,
        },
        Err(err) => Err(WatchError::Source(err)),
    };

    // The receiver only goes away with the watcher
    let _ = tx.send(signal);
}

/// Translate a notify event into a raw record
///
/// Returns `None` for events that do not change anything (access, unknown).
fn translate(event: notify::Event, known_folders: &HashSet<PathBuf>) -> Option<RawEvent> {
    let mut paths = event.paths.into_iter();

    let (op, path) = match event.kind {
        EventKind::Create(_) => (Op::Create, paths.next()?),
        EventKind::Remove(_) => (Op::Remove, paths.next()?),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let from = paths.next()?;
            let to = paths.next()?;
            let is_dir = to.is_dir();
            trace!("Rename {} -> {}", from.display(), to.display());
            return Some(RawEvent::renamed(
                Op::Rename,
                &from.to_string_lossy(),
                &to.to_string_lossy(),
                is_dir,
            ));
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => (Op::Remove, paths.next()?),
        EventKind::Modify(ModifyKind::Name(_)) => (Op::Move, paths.next()?),
        EventKind::Modify(ModifyKind::Metadata(_)) => (Op::Chmod, paths.next()?),
        EventKind::Modify(_) => (Op::Write, paths.next()?),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return None,
    };

    let is_dir = match op {
        Op::Remove => known_folders.contains(&path),
        _ => path.is_dir(),
    };

    Some(RawEvent::new(op, path.to_string_lossy(), is_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};
    use tempfile::TempDir;

    fn event(kind: EventKind, paths: &[&Path]) -> notify::Event {
        paths
            .iter()
            .fold(notify::Event::new(kind), |event, path| event.add_path(path.to_path_buf()))
    }

    #[test]
    fn test_create_and_write_map_directly() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        std::fs::write(&file, b"a").unwrap();
        let known = HashSet::new();

        let raw = translate(event(EventKind::Create(CreateKind::Any), &[&file]), &known).unwrap();
        assert_eq!(raw, RawEvent::new(Op::Create, file.to_string_lossy(), false));

        let raw = translate(
            event(EventKind::Modify(ModifyKind::Data(DataChange::Any)), &[&file]),
            &known,
        )
        .unwrap();
        assert_eq!(raw.op, Op::Write);

        let raw = translate(
            event(
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
                &[&file],
            ),
            &known,
        )
        .unwrap();
        assert_eq!(raw.op, Op::Chmod);
    }

    #[test]
    fn test_folder_flag_from_filesystem() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("new-folder");
        std::fs::create_dir(&folder).unwrap();

        let raw = translate(
            event(EventKind::Create(CreateKind::Folder), &[&folder]),
            &HashSet::new(),
        )
        .unwrap();
        assert_eq!(raw.op, Op::Create);
        assert!(raw.is_dir);
    }

    #[test]
    fn test_removed_folder_recognized_from_registrations() {
        let gone = PathBuf::from("/no/longer/here");
        let known = HashSet::from([gone.clone()]);

        let raw = translate(event(EventKind::Remove(RemoveKind::Any), &[&gone]), &known).unwrap();
        assert_eq!(raw.op, Op::Remove);
        assert!(raw.is_dir);

        let raw = translate(
            event(EventKind::Remove(RemoveKind::Any), &[Path::new("/other")]),
            &known,
        )
        .unwrap();
        assert!(!raw.is_dir);
    }

    #[test]
    fn test_rename_pair_encoded_with_arrow() {
        let raw = translate(
            event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &[Path::new("/a/old"), Path::new("/a/new")],
            ),
            &HashSet::new(),
        )
        .unwrap();
        assert_eq!(raw.op, Op::Rename);
        assert_eq!(raw.path, "/a/old -> /a/new");
    }

    #[test]
    fn test_rename_halves() {
        let known = HashSet::new();

        let raw = translate(
            event(
                EventKind::Modify(ModifyKind::Name(RenameMode::From)),
                &[Path::new("/a/old")],
            ),
            &known,
        )
        .unwrap();
        assert_eq!(raw.op, Op::Remove);

        let raw = translate(
            event(
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                &[Path::new("/a/new")],
            ),
            &known,
        )
        .unwrap();
        assert_eq!(raw.op, Op::Move);
        assert_eq!(raw.path, "/a/new");
    }

    #[test]
    fn test_non_changes_ignored() {
        let known = HashSet::new();
        let path = Path::new("/a/file");

        assert!(translate(event(EventKind::Access(AccessKind::Any), &[path]), &known).is_none());
        assert!(translate(event(EventKind::Other, &[path]), &known).is_none());
        // No path at all
        assert!(translate(event(EventKind::Create(CreateKind::Any), &[]), &known).is_none());
    }

    #[tokio::test]
    async fn test_close_ends_raw_stream() {
        let temp_dir = TempDir::new().unwrap();
        let (source, mut raw) = PollSource::new(Duration::from_millis(20)).unwrap();
        source.add(temp_dir.path()).unwrap();

        source.close();
        let ended = tokio::time::timeout(Duration::from_secs(5), async {
            while raw.recv().await.is_some() {}
        })
        .await;
        assert!(ended.is_ok());

        // Registration after close fails
        assert!(source.add(temp_dir.path()).is_err());
    }

    #[test]
    fn test_missing_folder_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let (source, _raw) = PollSource::new(Duration::from_millis(50)).unwrap();

        assert!(source.add(&temp_dir.path().join("missing")).is_err());
    }
}
