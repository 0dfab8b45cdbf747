use blobsync::config::{RawOptions, SyncOptions};
use blobsync::console::{Console, TermConsole};
use blobsync::core::SyncEngine;
use blobsync::{logging, storage};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "blobsync",
    version,
    about = "One-way Azure Blob container to local folder synchronization"
)]
struct Cli {
    /// Storage account connection string
    #[arg(long = "connection")]
    connection: Option<String>,

    /// Blob container name
    #[arg(long = "container")]
    container: Option<String>,

    /// Local folder path
    #[arg(long = "path")]
    path: Option<PathBuf>,

    /// Download threads
    #[arg(long = "threads", default_value_t = 10)]
    threads: usize,

    /// Run without interactive prompts, assuming affirmative answers
    #[arg(long = "silence")]
    silence: bool,

    /// Keep timestamped copies of replaced local files
    #[arg(long = "keepold")]
    keep_old: bool,

    /// Compare file MD5 hashes in addition to name and length
    #[arg(long = "comparehash", default_value_t = true, action = clap::ArgAction::Set)]
    compare_hash: bool,

    /// Echo diagnostics to the terminal
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _guard = logging::init(cli.verbose);

    let console: Arc<dyn Console> = Arc::new(TermConsole::new());
    console.line(&format!("blobsync {}", env!("CARGO_PKG_VERSION")));

    if let Err(e) = run(cli, console.clone()).await {
        console.error(&format!("{e:#}"));
        tracing::error!("run failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, console: Arc<dyn Console>) -> anyhow::Result<()> {
    let options = SyncOptions::resolve(
        RawOptions {
            connection_string: cli.connection,
            container: cli.container,
            local_path: cli.path,
            threads: cli.threads,
            silence: cli.silence,
            keep_old: cli.keep_old,
            compare_hash: cli.compare_hash,
        },
        console.as_ref(),
    )?;

    let store = storage::create_store(&options)?;
    let engine = SyncEngine::new(options, store, console);
    engine.run().await?;
    Ok(())
}
