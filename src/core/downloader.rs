use crate::console::Console;
use crate::storage::{FileRecord, RemoteStore};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Outcome counters for one scheduler run. Shared by the concurrent download
/// tasks, so increments are atomic; owned per-instance, never process-wide.
#[derive(Debug, Default)]
struct DownloadStats {
    not_downloaded: AtomicU32,
    archived_skipped: AtomicU32,
}

/// Totals reported back to the orchestrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadReport {
    pub not_downloaded: u32,
    pub archived_skipped: u32,
}

/// Executes the `to_download` set under bounded parallelism.
///
/// Archive-tier items are never attempted. Per-item failures are counted and
/// reported but never cancel sibling downloads; the scheduler returns only
/// after every scheduled item has completed or been skipped.
pub struct Downloader {
    store: Arc<dyn RemoteStore>,
    local_root: PathBuf,
    threads: usize,
    keep_old: bool,
    cancelled: Arc<AtomicBool>,
}

impl Downloader {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        local_root: impl Into<PathBuf>,
        threads: usize,
        keep_old: bool,
    ) -> Self {
        Self {
            store,
            local_root: local_root.into(),
            threads: threads.max(1),
            keep_old,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cooperative cancellation handle, observed before each new download
    /// starts. In-flight transfers run to completion.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub async fn run(
        &self,
        to_download: &[FileRecord],
        console: Arc<dyn Console>,
    ) -> DownloadReport {
        let semaphore = Arc::new(Semaphore::new(self.threads));
        let stats = Arc::new(DownloadStats::default());
        let mut handles = Vec::new();

        for record in to_download.iter().cloned() {
            if self.cancelled.load(Ordering::SeqCst) {
                warn!("download phase cancelled before {}", record.name);
                break;
            }

            if record.is_archive {
                stats.archived_skipped.fetch_add(1, Ordering::Relaxed);
                stats.not_downloaded.fetch_add(1, Ordering::Relaxed);
                console.notice(&format!("Skipped archived file '{}'.", record.name));
                continue;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("download semaphore closed");
            let store = self.store.clone();
            let local_root = self.local_root.clone();
            let keep_old = self.keep_old;
            let stats = stats.clone();
            let console = console.clone();

            handles.push(tokio::spawn(async move {
                match download_one(store.as_ref(), &local_root, &record.name, keep_old).await {
                    Ok(()) => {
                        console.line(&format!(
                            "[{}] Downloaded {}.",
                            chrono::Local::now().format("%H:%M:%S"),
                            record.name
                        ));
                        debug!("downloaded {}", record.name);
                    }
                    Err(e) => {
                        stats.not_downloaded.fetch_add(1, Ordering::Relaxed);
                        console.error(&format!("Failed to download {}: {:#}", record.name, e));
                        warn!("failed to download {}: {:#}", record.name, e);
                    }
                }
                drop(permit);
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        DownloadReport {
            not_downloaded: stats.not_downloaded.load(Ordering::Relaxed),
            archived_skipped: stats.archived_skipped.load(Ordering::Relaxed),
        }
    }
}

/// One download: resolve the destination (creating implied parent
/// directories), handle an existing file per the keep-old policy, then fetch
/// to a temporary sibling and rename into place so a failed transfer never
/// leaves a corrupt destination.
async fn download_one(
    store: &dyn RemoteStore,
    local_root: &Path,
    name: &str,
    keep_old: bool,
) -> Result<()> {
    let dest = local_root.join(name);

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    if keep_old && fs::try_exists(&dest).await.unwrap_or(false) {
        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let renamed = dest.with_file_name(timestamped_name(&file_name, &stamp));
        fs::rename(&dest, &renamed).await?;
        debug!("kept old copy of {} as {}", name, renamed.display());
    }

    let part = dest.with_file_name(format!(
        "{}.part",
        dest.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    ));

    match store.download(name, &part).await {
        Ok(()) => {
            fs::rename(&part, &dest).await?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&part).await;
            Err(e)
        }
    }
}

/// Insert a timestamp before the extension: `report.csv` becomes
/// `report_20240131_120000.csv`. Two renames of the same base name within
/// one second collide and the last one wins; that is accepted behavior.
fn timestamped_name(file_name: &str, stamp: &str) -> String {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => {
            let (base, ext) = file_name.split_at(pos);
            format!("{base}_{stamp}{ext}")
        }
        _ => format!("{file_name}_{stamp}"),
    }
}
