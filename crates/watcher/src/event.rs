//! Raw change records and their classification
//!
//! Raw sources report one record per observed change. Renames and moves
//! carry both ends in a single path string, `"<old> -> <new>"`; only the
//! new end is interesting once a path has to settle.

use path_absolutize::Absolutize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Marker separating the old and new ends of a rename or move
pub const RENAME_ARROW: &str = "-> ";

/// Kind of raw change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Path created
    Create,
    /// Contents written
    Write,
    /// Path removed
    Remove,
    /// Renamed in place; path is `"<old> -> <new>"`
    Rename,
    /// Moved; path may be `"<old> -> <new>"`
    Move,
    /// Permissions or other metadata changed
    Chmod,
}

impl Op {
    /// Operations that can bring a new folder into existence
    pub fn creates_path(self) -> bool {
        matches!(self, Op::Create | Op::Move | Op::Rename)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Create => write!(f, "create"),
            Op::Write => write!(f, "write"),
            Op::Remove => write!(f, "remove"),
            Op::Rename => write!(f, "rename"),
            Op::Move => write!(f, "move"),
            Op::Chmod => write!(f, "chmod"),
        }
    }
}

/// One change reported by a raw source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Type of change
    pub op: Op,
    /// Path as reported by the source (rename/move encoded)
    pub path: String,
    /// Whether the changed path is a folder
    pub is_dir: bool,
}

impl RawEvent {
    pub fn new(op: Op, path: impl Into<String>, is_dir: bool) -> Self {
        Self {
            op,
            path: path.into(),
            is_dir,
        }
    }

    /// A rename or move from `from` to `to`
    pub fn renamed(op: Op, from: &str, to: &str, is_dir: bool) -> Self {
        Self::new(op, format!("{from} {RENAME_ARROW}{to}"), is_dir)
    }
}

/// Path a raw record refers to after the change
///
/// Rename and move records keep what follows the first `"-> "`; every
/// other record is returned unchanged.
pub fn watcher_path(raw_path: &str, op: Op) -> &str {
    if !matches!(op, Op::Rename | Op::Move) {
        return raw_path;
    }

    match raw_path.find(RENAME_ARROW) {
        Some(index) => &raw_path[index + RENAME_ARROW.len()..],
        None => raw_path,
    }
}

/// Canonical absolute path for a raw record
///
/// Relative paths are resolved against the working directory and `.`/`..`
/// are removed lexically. Returns `None` when that fails or leaves nothing,
/// in which case the record is dropped.
pub fn classify(event: &RawEvent) -> Option<PathBuf> {
    let path = watcher_path(&event.path, event.op);
    if path.is_empty() {
        return None;
    }

    match Path::new(path).absolutize() {
        Ok(absolute) if !absolute.as_os_str().is_empty() => Some(absolute.into_owned()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_keeps_new_end() {
        assert_eq!(watcher_path("myFile -> myNewFile", Op::Rename), "myNewFile");
        assert_eq!(watcher_path("/a/old -> /a/new", Op::Move), "/a/new");

        let event = RawEvent::new(Op::Rename, "/a/old -> /a/new", false);
        assert_eq!(classify(&event), Some(PathBuf::from("/a/new")));
    }

    #[test]
    fn test_first_arrow_wins() {
        assert_eq!(watcher_path("/a -> /b -> /c", Op::Rename), "/b -> /c");
    }

    #[test]
    fn test_other_ops_use_raw_path() {
        let event = RawEvent::new(Op::Write, "/a/file", false);
        assert_eq!(classify(&event), Some(PathBuf::from("/a/file")));

        // An arrow in a plain write is part of the file name
        assert_eq!(watcher_path("/a/x -> y", Op::Write), "/a/x -> y");
    }

    #[test]
    fn test_relative_paths_made_absolute() {
        let event = RawEvent::new(Op::Create, "some/dir/../file", false);
        let cwd = std::env::current_dir().unwrap();

        let classified = classify(&event).unwrap();
        assert!(classified.is_absolute());
        assert_eq!(classified, cwd.join("some").join("file"));
    }

    #[test]
    fn test_empty_paths_dropped() {
        assert_eq!(classify(&RawEvent::new(Op::Write, "", false)), None);
        assert_eq!(classify(&RawEvent::new(Op::Rename, "/a/old -> ", false)), None);
    }

    #[test]
    fn test_renamed_constructor_round_trips() {
        let event = RawEvent::renamed(Op::Move, "/from/here", "/to/there", true);
        assert_eq!(event.path, "/from/here -> /to/there");
        assert_eq!(classify(&event).as_deref(), Some(Path::new("/to/there")));
    }

    #[test]
    fn test_creation_class_ops() {
        assert!(Op::Create.creates_path());
        assert!(Op::Move.creates_path());
        assert!(Op::Rename.creates_path());
        assert!(!Op::Write.creates_path());
        assert!(!Op::Remove.creates_path());
        assert!(!Op::Chmod.creates_path());
    }
}
