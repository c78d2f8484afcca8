//! List the folders a watcher would observe

use super::WatchArgs;
use anyhow::{Context, Result};
use watcher::Watcher;

pub async fn run(args: &WatchArgs) -> Result<()> {
    let options = args.options()?;
    let (watcher, _notifications) =
        Watcher::new(options).context("Failed to determine watch folders")?;

    for folder in watcher.watch_folders() {
        println!("{}", folder.display());
    }

    watcher.close();
    Ok(())
}
