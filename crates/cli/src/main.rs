//! settle - print files and folders once they stop changing

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

use cmd::WatchArgs;

/// Settle - debounced file and folder change notifications
#[derive(Parser)]
#[command(name = "settle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debounce activity (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch folders and print changes once they settle
    Watch(WatchArgs),
    /// Print the folders that would be watched
    Folders(WatchArgs),
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("watcher=debug,settle=debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Watch(args) => cmd::watch::run(&args).await,
        Commands::Folders(args) => cmd::folders::run(&args).await,
    }
}
