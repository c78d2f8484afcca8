//! CLI command implementations

pub mod folders;
pub mod watch;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use watcher::Options;

/// Poll interval used when neither a flag nor the config file sets one
pub const DEFAULT_POLL_MS: u64 = 100;

/// Options shared by every command that builds a watcher
#[derive(Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Root folders to watch (default: current directory)
    pub roots: Vec<PathBuf>,

    /// TOML file with watcher options; flags override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip folders with this name (repeatable, whole path segments only)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub exclusions: Vec<String>,

    /// Also watch folders whose name starts with '.'
    #[arg(long)]
    pub include_hidden: bool,

    /// Watch only the roots, not their subfolders
    #[arg(long)]
    pub exclude_subdirs: bool,

    /// Start watching folders created while running
    #[arg(long)]
    pub follow_new_folders: bool,

    /// Poll interval in milliseconds (settle time is twice this)
    #[arg(long, value_name = "MS")]
    pub poll_ms: Option<u64>,
}

/// On-disk options; every field optional so flags can fill the gaps
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileOptions {
    root_folders: Vec<PathBuf>,
    folder_exclusions: Vec<String>,
    include_hidden: bool,
    exclude_subdirs: bool,
    follow_new_folders: bool,
    poll_interval_ms: Option<u64>,
}

fn load_file(path: &Path) -> Result<FileOptions> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

impl WatchArgs {
    /// Merge the config file (if any) with the command-line flags
    ///
    /// Roots and poll interval from flags replace the file's; exclusions are
    /// appended; switches are on if either side turns them on.
    pub fn options(&self) -> Result<Options> {
        let file = match &self.config {
            Some(path) => load_file(path)?,
            None => FileOptions::default(),
        };

        let roots = if !self.roots.is_empty() {
            self.roots.clone()
        } else if !file.root_folders.is_empty() {
            file.root_folders
        } else {
            vec![PathBuf::from(".")]
        };

        let poll_ms = self
            .poll_ms
            .or(file.poll_interval_ms)
            .unwrap_or(DEFAULT_POLL_MS);

        let mut options = Options::new(roots, Duration::from_millis(poll_ms))
            .include_hidden(self.include_hidden || file.include_hidden)
            .exclude_subdirs(self.exclude_subdirs || file.exclude_subdirs)
            .follow_new_folders(self.follow_new_folders || file.follow_new_folders);
        for pattern in file.folder_exclusions.into_iter().chain(self.exclusions.iter().cloned()) {
            options = options.exclude(pattern);
        }

        options.validate().context("Invalid watcher options")?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let options = WatchArgs::default().options().unwrap();
        assert_eq!(options.root_folders, vec![PathBuf::from(".")]);
        assert_eq!(options.poll_interval, Duration::from_millis(DEFAULT_POLL_MS));
        assert!(options.folder_exclusions.is_empty());
        assert!(!options.include_hidden);
    }

    #[test]
    fn test_flags_override_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_dir.path().join("settle.toml");
        std::fs::write(
            &config,
            r#"
root_folders = ["from-file"]
folder_exclusions = ["target"]
include_hidden = true
poll_interval_ms = 500
"#,
        )
        .unwrap();

        let args = WatchArgs {
            roots: vec![PathBuf::from("from-flags")],
            config: Some(config.clone()),
            exclusions: vec!["node_modules".to_string()],
            poll_ms: Some(20),
            ..Default::default()
        };
        let options = args.options().unwrap();

        assert_eq!(options.root_folders, vec![PathBuf::from("from-flags")]);
        assert_eq!(
            options.folder_exclusions,
            vec!["target".to_string(), "node_modules".to_string()]
        );
        assert!(options.include_hidden);
        assert_eq!(options.poll_interval, Duration::from_millis(20));

        // File alone
        let args = WatchArgs {
            config: Some(config),
            ..Default::default()
        };
        let options = args.options().unwrap();
        assert_eq!(options.root_folders, vec![PathBuf::from("from-file")]);
        assert_eq!(options.poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_zero_poll_rejected() {
        let args = WatchArgs {
            poll_ms: Some(0),
            ..Default::default()
        };
        assert!(args.options().is_err());
    }

    #[test]
    fn test_unknown_config_key_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_dir.path().join("settle.toml");
        std::fs::write(&config, "poll_interval = 5\n").unwrap();

        let args = WatchArgs {
            config: Some(config),
            ..Default::default()
        };
        assert!(args.options().is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let args = WatchArgs {
            config: Some(PathBuf::from("/definitely/not/here.toml")),
            ..Default::default()
        };
        let err = args.options().unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
