//! Tracing setup: console diagnostics when asked for, rolling file log
//! always (best effort).

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. Returns the appender guard, which the
/// caller must hold for the process lifetime so buffered log lines are
/// flushed on exit.
pub fn init(verbose: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let log_dir = default_log_dir();
    let file_layer = std::fs::create_dir_all(&log_dir).ok().map(|_| {
        let appender = tracing_appender::rolling::daily(&log_dir, "blobsync.log");
        tracing_appender::non_blocking(appender)
    });

    let (file_writer, guard) = match file_layer {
        Some((writer, guard)) => (Some(writer), Some(guard)),
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(file_writer.map(|w| {
            tracing_subscriber::fmt::layer()
                .with_writer(w)
                .with_ansi(false)
                .with_target(false)
        }))
        .with(verbose.then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
        }));

    let _ = tracing::subscriber::set_global_default(registry);

    guard
}

/// Platform log directory, without pulling in a directories crate.
fn default_log_dir() -> PathBuf {
    let base = if cfg!(target_os = "windows") {
        std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
    } else if cfg!(target_os = "macos") {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library").join("Logs"))
    } else {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(".local").join("state"))
    };

    base.unwrap_or_else(|| PathBuf::from(".")).join("blobsync")
}
