use crate::config::SyncOptions;
use crate::console::Console;
use crate::core::cleaner::Cleaner;
use crate::core::comparator;
use crate::core::downloader::{DownloadReport, Downloader};
use crate::core::scanner::LocalScanner;
use crate::storage::RemoteStore;
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Final tallies of one sync run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub cloud_files: usize,
    pub local_files: usize,
    pub to_download: usize,
    pub downloaded: usize,
    pub deleted: u32,
    pub archived_skipped: u32,
}

/// Sequences one full run: verify container, collect both inventories,
/// diff, download, clean up, summarize. Fatal errors (setup, listing)
/// propagate to the caller; per-item problems are absorbed by the
/// downstream components and show up only in the counters.
pub struct SyncEngine {
    options: SyncOptions,
    store: Arc<dyn RemoteStore>,
    console: Arc<dyn Console>,
}

impl SyncEngine {
    pub fn new(options: SyncOptions, store: Arc<dyn RemoteStore>, console: Arc<dyn Console>) -> Self {
        Self {
            options,
            store,
            console,
        }
    }

    pub async fn run(&self) -> Result<SyncReport> {
        let options = &self.options;
        let console = self.console.as_ref();

        self.print_parameters();

        if !options.silence && !console.confirm("Good to go?") {
            return Ok(SyncReport::default());
        }

        self.store.verify().await?;

        console.status("Finding files on Azure Storage...");
        let cloud_files = self
            .store
            .list(options.compare_hash)
            .await
            .context("failed to enumerate the container")?;
        console.line(&format!("{} cloud file(s) found.", cloud_files.len()));

        let scanner = LocalScanner::new(options.threads, options.compare_hash);
        let local_files = scanner
            .scan(&options.local_path)
            .await
            .context("failed to scan the local folder")?;
        console.line(&format!("{} local file(s) found.", local_files.len()));

        console.status("Comparing file metadata...");
        let diff = comparator::diff(&cloud_files, &local_files);
        info!(
            "diff: {} to download, {} redundant",
            diff.to_download.len(),
            diff.redundant.len()
        );

        let mut download_report = DownloadReport::default();
        if diff.to_download.is_empty() {
            console.line("No new files need to be downloaded.");
        } else if options.silence
            || console.confirm(&format!(
                "{} new file(s) to download. Continue?",
                diff.to_download.len()
            ))
        {
            let downloader = Downloader::new(
                self.store.clone(),
                &options.local_path,
                options.threads,
                options.keep_old,
            );
            download_report = downloader
                .run(&diff.to_download, self.console.clone())
                .await;
        }

        let cleaner = Cleaner::new(&options.local_path, options.silence, options.keep_old);
        let deleted = cleaner.run(&diff.redundant, console).await;

        let downloaded = diff
            .to_download
            .len()
            .saturating_sub(download_report.not_downloaded as usize);

        console.line("----------------------------------------------------");
        console.line(&format!(
            "{} file(s) downloaded, {} file(s) deleted, {} archived file(s) skipped.",
            downloaded, deleted, download_report.archived_skipped
        ));

        Ok(SyncReport {
            cloud_files: cloud_files.len(),
            local_files: local_files.len(),
            to_download: diff.to_download.len(),
            downloaded,
            deleted,
            archived_skipped: download_report.archived_skipped,
        })
    }

    fn print_parameters(&self) {
        let options = &self.options;
        self.console.table(
            &["Parameter", "Value"],
            &[
                vec!["Container Name".to_string(), options.container.clone()],
                vec!["Download Threads".to_string(), options.threads.to_string()],
                vec![
                    "Local Path".to_string(),
                    options.local_path.display().to_string(),
                ],
                vec!["Keep Old".to_string(), options.keep_old.to_string()],
                vec!["Compare Hash".to_string(), options.compare_hash.to_string()],
            ],
        );
    }
}
