//! Initial folder discovery
//!
//! Walks each root and lists the folders to hand to the raw source. Hidden
//! and excluded folders are pruned together with everything below them.

use crate::error::{Result, WatchError};
use crate::ignore::{is_hidden, FolderExclusions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Discover the folders to observe under `roots`
///
/// With `exclude_subdirs` the roots are returned as-is, without touching the
/// filesystem. Otherwise every root is walked; a folder is kept when it is
/// visible (or `include_hidden` is set) and not excluded, and a folder that
/// fails either test is not descended into. Parents come before children,
/// siblings in file-name order.
pub fn discover(
    roots: &[PathBuf],
    exclude_subdirs: bool,
    include_hidden: bool,
    exclusions: &FolderExclusions,
) -> Result<Vec<PathBuf>> {
    if exclude_subdirs {
        return Ok(roots.to_vec());
    }

    let mut folders = Vec::new();
    for root in roots {
        walk_root(root, include_hidden, exclusions, &mut folders)?;
    }
    Ok(folders)
}

fn walk_root(
    root: &Path,
    include_hidden: bool,
    exclusions: &FolderExclusions,
    folders: &mut Vec<PathBuf>,
) -> Result<()> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| should_visit(entry, include_hidden, exclusions));

    for entry in walker {
        match entry {
            Ok(entry) => folders.push(entry.into_path()),
            Err(err) => {
                let depth = err.depth();
                let path = err.path().unwrap_or(root).to_path_buf();
                let source = io::Error::from(err);

                // Entries that disappear mid-walk are not worth failing over
                if depth > 0 && source.kind() == io::ErrorKind::NotFound {
                    debug!("Folder vanished during discovery: {}", path.display());
                    continue;
                }
                return Err(WatchError::Discovery { path, source });
            }
        }
    }

    Ok(())
}

fn should_visit(entry: &DirEntry, include_hidden: bool, exclusions: &FolderExclusions) -> bool {
    entry.file_type().is_dir()
        && (include_hidden || !is_hidden(entry.path()))
        && !exclusions.is_excluded(entry.path())
}
