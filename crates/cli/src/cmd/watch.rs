//! Print settled changes until interrupted

use super::WatchArgs;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::Path;
use tracing::info;
use watcher::Watcher;

pub async fn run(args: &WatchArgs) -> Result<()> {
    let options = args.options()?;
    let settle = options.settle_duration();
    let (watcher, mut notifications) = Watcher::new(options).context("Failed to start watcher")?;
    watcher.start().context("Failed to start watcher")?;

    let color = std::io::stdout().is_terminal();
    info!(
        "Watching {} folders, settle time {:?}. Press Ctrl-C to stop.",
        watcher.watch_folders().len(),
        settle
    );

    let closed = watcher.closed();
    tokio::pin!(closed);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(path) = notifications.files.recv() => print_change("file changed", &path, color),
            Some(path) = notifications.folders.recv() => print_change("folder changed", &path, color),
            Some(err) = notifications.errors.recv() => {
                if color {
                    println!("{} {}", "error".red(), err);
                } else {
                    println!("error {}", err);
                }
            }
            res = &mut ctrl_c => {
                res.context("Failed to listen for Ctrl-C")?;
                info!("Interrupted, shutting down");
                break;
            }
            _ = &mut closed => {
                info!("Watcher closed");
                break;
            }
        }
    }

    watcher.close();
    Ok(())
}

fn print_change(label: &str, path: &Path, color: bool) {
    if color {
        println!("{} {}", label.green(), path.display());
    } else {
        println!("{} {}", label, path.display());
    }
}
