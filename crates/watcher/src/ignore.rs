//! Folder ignore rules
//!
//! Two rules decide whether a folder is observed:
//! 1. Exclusion patterns: folder-name fragments matched against whole path
//!    segments (never partial names, never globs)
//! 2. Hidden folders: base name starting with `.`

use std::path::{Path, MAIN_SEPARATOR};

/// Normalized folder exclusion patterns
///
/// Each pattern is trimmed of leading and trailing separators and wrapped
/// with the platform separator, so `"exclude"`, `"/exclude/"` and
/// `"\\exclude"` all become `"/exclude/"` on unix. A candidate path is
/// wrapped the same way before a substring test, which makes `exclude`
/// match a segment named exactly `exclude` but not `excludeFoo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderExclusions {
    patterns: Vec<String>,
}

impl FolderExclusions {
    /// Build from raw patterns, discarding any that are empty after trimming
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: normalize(patterns),
        }
    }

    /// Check if a folder should be skipped
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        let wrapped = format!("{MAIN_SEPARATOR}{}{MAIN_SEPARATOR}", path.to_string_lossy());
        self.patterns
            .iter()
            .any(|pattern| wrapped.contains(pattern.as_str()))
    }

    /// Normalized patterns, separator-wrapped
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Trim separators from each pattern, drop empties, wrap with separators
pub fn normalize<I, S>(patterns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .filter_map(|pattern| {
            let trimmed = pattern.as_ref().trim_matches(|c| c == '/' || c == '\\');
            if trimmed.is_empty() {
                None
            } else {
                Some(format!("{MAIN_SEPARATOR}{trimmed}{MAIN_SEPARATOR}"))
            }
        })
        .collect()
}

/// Check if a folder is hidden (base name starts with `.`)
///
/// `.` and `..` have no base name of their own, so they are resolved to
/// the folder they point at first.
pub fn is_hidden(path: &Path) -> bool {
    match path.file_name() {
        Some(name) => name.to_string_lossy().starts_with('.'),
        None => path
            .canonicalize()
            .ok()
            .and_then(|resolved| {
                resolved
                    .file_name()
                    .map(|name| name.to_string_lossy().starts_with('.'))
            })
            .unwrap_or(false),
    }
}
